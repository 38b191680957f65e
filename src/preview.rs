// ── HTML labeling preview ─────────────────────────────────────────────────────
//
// A single static page showing every sliced tile with a text box for its
// label. The manifest is embedded as inline JSON; the page can download the
// edited manifest and merge labels from a previously saved one (by `file`).

use std::path::Path;

use crate::error::Result;
use crate::manifest::TileRecord;

const TEMPLATE: &str = r##"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <title>Sprite Labeler</title>
  <style>
    :root { font-family: "SF Mono", "Menlo", monospace; background: #f5f1ea; color: #2a2320; }
    body { margin: 24px; }
    header { display: flex; gap: 12px; align-items: center; flex-wrap: wrap; margin-bottom: 18px; }
    button { background: #2a2320; color: #f5f1ea; border: 0; padding: 8px 12px; cursor: pointer; }
    input[type="text"] { width: 100%; padding: 6px 8px; border: 1px solid #b9b1a7; border-radius: 4px; }
    .grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(220px, 1fr)); gap: 16px; }
    .card { background: #fffaf2; border: 1px solid #d8d0c6; padding: 10px; border-radius: 6px; }
    .card img {
      width: 100%; height: auto; display: block; margin-bottom: 8px;
      background: repeating-linear-gradient(45deg, #eee 0, #eee 10px, #f7f7f7 10px, #f7f7f7 20px);
    }
    .meta { font-size: 12px; margin-bottom: 6px; color: #6b5f57; }
  </style>
</head>
<body>
  <header>
    <button id="download">Download labels.json</button>
    <label>Load labels.json <input id="load" type="file" accept="application/json" /></label>
    <span>Images are relative to: __OUT_DIR__</span>
  </header>
  <div class="grid" id="grid"></div>
  <script>
    const records = __RECORDS__;
    const grid = document.getElementById("grid");

    function render() {
      grid.innerHTML = "";
      records.forEach((rec, idx) => {
        const card = document.createElement("div");
        card.className = "card";
        const img = document.createElement("img");
        img.src = rec.file;
        img.alt = rec.sheet + " " + rec.tile_index;
        const meta = document.createElement("div");
        meta.className = "meta";
        meta.textContent = `${rec.sheet} | tile ${rec.tile_index} (r${rec.row} c${rec.col})`;
        const input = document.createElement("input");
        input.type = "text";
        input.placeholder = "label";
        input.value = rec.label || "";
        input.addEventListener("input", (e) => { records[idx].label = e.target.value; });
        card.append(img, meta, input);
        grid.appendChild(card);
      });
    }

    document.getElementById("download").addEventListener("click", () => {
      const blob = new Blob([JSON.stringify(records, null, 2)], { type: "application/json" });
      const url = URL.createObjectURL(blob);
      const a = document.createElement("a");
      a.href = url;
      a.download = "labels.json";
      document.body.appendChild(a);
      a.click();
      a.remove();
      URL.revokeObjectURL(url);
    });

    document.getElementById("load").addEventListener("change", (e) => {
      const file = e.target.files[0];
      if (!file) return;
      const reader = new FileReader();
      reader.onload = () => {
        try {
          const loaded = JSON.parse(reader.result);
          const byFile = new Map(loaded.map((r) => [r.file, r]));
          records.forEach((rec) => {
            const match = byFile.get(rec.file);
            if (match && match.label) rec.label = match.label;
          });
          render();
        } catch (err) {
          alert("Failed to load labels.json");
        }
      };
      reader.readAsText(file);
    });

    render();
  </script>
</body>
</html>
"##;

/// Render the preview page for `records` whose files are relative to `out_dir`.
pub fn render_html(records: &[TileRecord], out_dir: &Path) -> Result<String> {
    // `</` inside the inline script would close the tag early.
    let json = serde_json::to_string(records)?.replace("</", "<\\/");
    let out_dir = html_escape(&out_dir.to_string_lossy().replace('\\', "/"));
    Ok(TEMPLATE
        .replace("__OUT_DIR__", &out_dir)
        .replace("__RECORDS__", &json))
}

/// Render and write the preview page.
pub fn write_html(records: &[TileRecord], out_dir: &Path, html_path: &Path) -> Result<()> {
    if let Some(parent) = html_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(html_path, render_html(records, out_dir)?)?;
    Ok(())
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Open `path` in the platform's default viewer. Failures are ignored.
pub fn open_in_viewer(path: &Path) {
    let program = if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "windows") {
        "explorer"
    } else {
        "xdg-open"
    };
    if let Err(e) = std::process::Command::new(program).arg(path).spawn() {
        tracing::debug!("could not open {}: {e}", path.display());
    }
}
