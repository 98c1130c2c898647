//! HTML rendering for the upload, result and error pages

use crate::config::AppConfig;
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Hint shown under every processing failure
pub const ERROR_HINT: &str = "Try uploading a different image or check if the file is corrupted.";

/// What the result page shows after a successful removal
#[derive(Debug)]
pub struct ResultView<'a> {
    pub original: &'a [u8],
    pub original_mime: &'a str,
    pub processed_png: &'a [u8],
    pub download_name: &'a str,
}

/// Escape text for HTML element content and quoted attributes
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// `data:` URL for inline display
#[must_use]
pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Landing page with the upload form
#[must_use]
pub fn index(config: &AppConfig) -> String {
    let body = format!(
        "{}\n{}",
        upload_section(config),
        info_box(
            "🚀 Get Started",
            "Choose an image above and press <em>Remove background</em>. Monk will remove the \
             background and create a transparent PNG file for you to download!",
        )
    );
    layout(config, &body)
}

/// Original and processed images side by side with a download link
#[must_use]
pub fn result(config: &AppConfig, view: &ResultView<'_>) -> String {
    let processed_url = data_url("image/png", view.processed_png);
    let download_name = escape_html(view.download_name);

    let mut body = upload_section(config);
    body.push_str(&format!(
        r#"
<div class="columns">
  <div class="column card">
    <div class="section-header">📷 Original Image</div>
    <img src="{original}" alt="Your uploaded image">
    <p class="caption">Your uploaded image</p>
  </div>
  <div class="column card">
    <div class="section-header">✨ Processed Image</div>
    <img class="checkerboard" src="{processed}" alt="Background removed">
    <p class="caption">Background removed</p>
  </div>
</div>
<div class="success-box">
  <h3>✅ Success!</h3>
  <p>Your background has been removed. Click below to download your transparent PNG!</p>
  <a id="download-link" class="button download" href="{processed}" download="{download_name}">⬇️ Download Transparent PNG</a>
</div>"#,
        original = data_url(view.original_mime, view.original),
        processed = processed_url,
    ));
    layout(config, &body)
}

/// Upload form plus a single error message and hint; never a download link
#[must_use]
pub fn error(config: &AppConfig, message: &str) -> String {
    let mut body = upload_section(config);
    body.push_str(&format!(
        r#"
<div class="error-box" role="alert">
  <p>❌ Error processing image: {message}</p>
</div>
{hint}"#,
        message = escape_html(message),
        hint = info_box("ℹ️ What now?", ERROR_HINT),
    ));
    layout(config, &body)
}

fn info_box(title: &str, text: &str) -> String {
    format!(
        r#"<div class="info-box">
  <h3>{title}</h3>
  <p>{text}</p>
</div>"#
    )
}

fn upload_section(config: &AppConfig) -> String {
    let formats = config
        .upload
        .accepted_extensions
        .iter()
        .map(|ext| ext.to_uppercase())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"<div class="card upload">
  <div class="section-header">📸 Upload Image</div>
  <form id="upload-form" action="/remove" method="post" enctype="multipart/form-data">
    <input type="file" name="image" accept="{accept}" required>
    <p class="help">Supported formats: {formats} (Max {max_mb}MB)</p>
    <button class="button" type="submit">Remove background</button>
  </form>
  <p id="processing" class="processing" hidden>🔄 Removing background... (First time may take 1-2 minutes)</p>
</div>"#,
        accept = escape_html(&config.upload.accept_attribute()),
        formats = escape_html(&formats),
        max_mb = config.server.max_upload_mb,
    )
}

fn layout(config: &AppConfig, body: &str) -> String {
    let theme = &config.theme;
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>
  :root {{
    --primary-color: {primary};
    --secondary-color: {secondary};
    --accent-color: {accent};
  }}
  body {{ margin: 0; font-family: system-ui, sans-serif; background: #f6f7fb; color: #333; }}
  main {{ max-width: 1100px; margin: 0 auto; padding: 20px; }}
  .header-container {{ text-align: center; margin-bottom: 40px; }}
  .title {{
    font-size: 48px; font-weight: 700; margin: 20px 0;
    background: linear-gradient(135deg, var(--primary-color) 0%, var(--secondary-color) 100%);
    -webkit-background-clip: text; background-clip: text; -webkit-text-fill-color: transparent;
  }}
  .subtitle {{ font-size: 18px; color: #666; margin-bottom: 30px; }}
  .card {{ background: white; border-radius: 15px; padding: 30px; box-shadow: 0 10px 30px rgba(0,0,0,0.1); margin: 20px 0; }}
  .section-header {{ font-size: 28px; font-weight: 700; margin: 0 0 20px 0; }}
  .button {{
    display: inline-block; background: linear-gradient(135deg, var(--primary-color) 0%, var(--secondary-color) 100%);
    color: white; border: none; border-radius: 10px; padding: 12px 30px; font-size: 16px;
    font-weight: 600; cursor: pointer; text-decoration: none; transition: all 0.3s ease;
  }}
  .button:hover {{ transform: translateY(-2px); box-shadow: 0 10px 25px rgba(102, 126, 234, 0.4); }}
  .help, .caption {{ color: #666; font-size: 14px; }}
  .processing {{ color: var(--primary-color); font-weight: 600; }}
  .columns {{ display: flex; gap: 20px; flex-wrap: wrap; }}
  .column {{ flex: 1 1 400px; }}
  .column img {{ max-width: 100%; display: block; margin: 0 auto; }}
  .checkerboard {{ background: repeating-conic-gradient(#ddd 0% 25%, #fff 0% 50%) 50% / 20px 20px; }}
  .success-box {{ background: linear-gradient(135deg, var(--accent-color) 0%, #8fd3f4 100%); padding: 20px; border-radius: 10px; margin: 20px 0; text-align: center; }}
  .info-box {{ background: linear-gradient(135deg, #a8edea 0%, #fed6e3 100%); padding: 20px; border-radius: 10px; margin: 20px 0; }}
  .error-box {{ background: #fde8e8; color: #9b1c1c; padding: 20px; border-radius: 10px; margin: 20px 0; }}
  footer {{ text-align: center; margin-top: 40px; color: #666; }}
</style>
</head>
<body>
<main>
<div class="header-container">
  <div class="title">🧘 {title}</div>
  <div class="subtitle">{tagline}</div>
</div>
{welcome}
{body}
<footer>
  <p><strong>{title}</strong></p>
  <p>{footer}</p>
</footer>
</main>
<script>
  document.getElementById("upload-form").addEventListener("submit", function () {{
    document.getElementById("processing").hidden = false;
  }});
  // Browsers cap the length of navigable data: URLs, so download from a Blob
  const link = document.getElementById("download-link");
  if (link) {{
    const href = link.getAttribute("href");
    const bytes = Uint8Array.from(atob(href.slice(href.indexOf(",") + 1)), (c) => c.charCodeAt(0));
    link.href = URL.createObjectURL(new Blob([bytes], {{ type: "image/png" }}));
  }}
</script>
</body>
</html>
"#,
        title = escape_html(&theme.app_title),
        tagline = escape_html(&theme.tagline),
        primary = escape_html(&theme.primary_color),
        secondary = escape_html(&theme.secondary_color),
        accent = escape_html(&theme.accent_color),
        footer = escape_html(&theme.footer),
        welcome = info_box(
            "✨ Welcome",
            "Upload any image and remove its background using AI. Download your transparent PNG \
             in seconds!",
        ),
    )
}
