// ── Background removal ───────────────────────────────────────────────────────
//
// Encoded image bytes in, encoded image bytes out. The cutout slicer only
// relies on the output decoding to an image of the same size with the
// background plausibly removed.

use std::io::{Cursor, ErrorKind, Read, Write};
use std::process::{Command, Stdio};

use image::ImageFormat;

use crate::error::{Error, Result};
use crate::matte::Matte;

pub trait BackgroundRemover {
    fn remove(&self, encoded: &[u8]) -> Result<Vec<u8>>;
}

/// Built-in remover: decode, apply a keyed-colour matte, re-encode as PNG.
#[derive(Clone, Debug)]
pub struct KeyColorRemover {
    pub matte: Matte,
}

impl BackgroundRemover for KeyColorRemover {
    fn remove(&self, encoded: &[u8]) -> Result<Vec<u8>> {
        let img = image::load_from_memory(encoded)?;
        let rgba = self.matte.apply_to_dynamic(img)?;
        let mut out = Cursor::new(Vec::new());
        rgba.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }
}

/// Pipes the bytes through an external program (stdin → stdout), e.g. a
/// model-based cutout tool.
#[derive(Clone, Debug)]
pub struct CommandRemover {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandRemover {
    /// Split a command line on whitespace: first word is the program.
    pub fn parse(command_line: &str) -> Result<Self> {
        let mut words = command_line.split_whitespace().map(str::to_owned);
        let program = words
            .next()
            .ok_or_else(|| Error::Remover("empty remover command".to_owned()))?;
        Ok(Self { program, args: words.collect() })
    }
}

impl BackgroundRemover for CommandRemover {
    fn remove(&self, encoded: &[u8]) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| Error::Remover(format!("failed to start `{}`: {e}", self.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Remover("child stdin unavailable".to_owned()))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Remover("child stdout unavailable".to_owned()))?;

        // stdin is fed from its own thread while stdout drains.
        let mut output = Vec::new();
        std::thread::scope(|s| -> Result<()> {
            let writer = s.spawn(move || stdin.write_all(encoded));
            stdout.read_to_end(&mut output)?;
            match writer.join() {
                Ok(Ok(())) => Ok(()),
                // Child exited without reading everything; its status decides.
                Ok(Err(e)) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
                Ok(Err(e)) => Err(e.into()),
                Err(_) => Err(Error::Remover("stdin writer panicked".to_owned())),
            }
        })?;

        let status = child.wait()?;
        if !status.success() {
            return Err(Error::Remover(format!("`{}` exited with {status}", self.program)));
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn key_color_remover_round_trips_png() {
        let img = RgbaImage::from_fn(4, 4, |x, _| {
            if x < 2 { Rgba([255, 255, 255, 255]) } else { Rgba([10, 20, 30, 255]) }
        });
        let mut png = Cursor::new(Vec::new());
        img.write_to(&mut png, ImageFormat::Png).unwrap();

        let remover = KeyColorRemover { matte: Matte::distance(30) };
        let out = remover.remove(png.get_ref()).unwrap();
        let decoded = image::load_from_memory(&out).unwrap().into_rgba8();
        assert_eq!(decoded.get_pixel(0, 0)[3], 0);
        assert_eq!(*decoded.get_pixel(3, 3), Rgba([10, 20, 30, 255]));
    }

    #[cfg(unix)]
    #[test]
    fn command_remover_pipes_large_payload_through_child() {
        let payload: Vec<u8> = (0..1024 * 1024).map(|i| (i % 251) as u8).collect();
        let out = CommandRemover::parse("cat").unwrap().remove(&payload).unwrap();
        assert_eq!(out, payload);
    }

    #[cfg(unix)]
    #[test]
    fn command_remover_reports_failing_child() {
        let err = CommandRemover::parse("false").unwrap().remove(b"png").unwrap_err();
        assert!(matches!(err, Error::Remover(_)));
    }

    #[test]
    fn command_remover_reports_missing_program() {
        let err = CommandRemover::parse("spritecut-no-such-remover")
            .unwrap()
            .remove(b"png")
            .unwrap_err();
        assert!(matches!(err, Error::Remover(_)));
    }

    #[test]
    fn parse_command_line() {
        let r = CommandRemover::parse("rembg i -m u2net").unwrap();
        assert_eq!(r.program, "rembg");
        assert_eq!(r.args, vec!["i", "-m", "u2net"]);
        assert!(CommandRemover::parse("   ").is_err());
    }
}
