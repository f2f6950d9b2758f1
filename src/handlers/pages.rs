//! Server-rendered HTML pages: upload form, document viewer, error page.
//!
//! Pages are assembled with `format!` and every interpolated value passes
//! through [`html_escape`].

use crate::models::document::{Document, Version};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

const STYLE: &str = r#"<style>
body{font-family:system-ui,sans-serif;margin:0;background:#f6f7f9;color:#1f2933}
header{background:#1f2933;color:#fff;padding:12px 24px}
header a{color:#fff;text-decoration:none;font-weight:600}
main{max-width:1100px;margin:24px auto;padding:0 24px}
.card{background:#fff;border-radius:8px;padding:20px;margin-bottom:16px;box-shadow:0 1px 3px rgba(0,0,0,.08)}
.banner{padding:10px 14px;border-radius:6px;margin-bottom:16px}
.banner.info{background:#e0f0ff}.banner.error{background:#ffe3e3}.banner.success{background:#e3f9e5}
label{display:block;margin:10px 0 4px;font-weight:600}
input,textarea,select{width:100%;box-sizing:border-box;padding:8px}
textarea{min-height:220px;font-family:monospace}
button{margin-top:14px;padding:8px 16px}
.muted{color:#616e7c;font-size:.9em}
</style>"#;

/// Escape text for safe interpolation into HTML bodies and attributes.
pub fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn layout(title: &str, body: &str) -> String {
    format!(
        concat!(
            "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">",
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">",
            "<title>{title}</title>{style}</head><body>",
            "<header><a href=\"/upload\">APIScope</a></header>",
            "<main>{body}</main></body></html>"
        ),
        title = html_escape(title),
        style = STYLE,
        body = body
    )
}

fn banner(message: &str, message_type: &str) -> String {
    if message.is_empty() {
        return String::new();
    }
    let class = match message_type {
        "error" | "success" => message_type,
        _ => "info",
    };
    format!(
        "<div class=\"banner {}\">{}</div>",
        class,
        html_escape(message)
    )
}

/// `GET /upload` page.
pub fn upload_page(message: &str, message_type: &str, max_file_size: usize) -> String {
    let body = format!(
        concat!(
            "{banner}<div class=\"card\"><h1>Upload OpenAPI Document</h1>",
            "<form method=\"post\" action=\"/upload\" enctype=\"multipart/form-data\">",
            "<label for=\"name\">Name</label>",
            "<input id=\"name\" name=\"name\" placeholder=\"Defaults to info.title\">",
            "<label for=\"description\">Description</label>",
            "<input id=\"description\" name=\"description\">",
            "<label for=\"version\">Version label</label>",
            "<input id=\"version\" name=\"version\" placeholder=\"Defaults to v1, v2, ...\">",
            "<label for=\"document_id\">Existing document id</label>",
            "<input id=\"document_id\" name=\"document_id\" placeholder=\"Leave empty to create a new document\">",
            "<label for=\"file\">File (.yaml, .yml, .json)</label>",
            "<input id=\"file\" type=\"file\" name=\"file\" accept=\".yaml,.yml,.json\">",
            "<p class=\"muted\">Maximum size: {max_mb} MB</p>",
            "<label for=\"yaml_content\">&hellip;or paste the document</label>",
            "<textarea id=\"yaml_content\" name=\"yaml_content\"></textarea>",
            "<button type=\"submit\">Upload</button>",
            "</form></div>"
        ),
        banner = banner(message, message_type),
        max_mb = max_file_size / (1024 * 1024),
    );
    layout("Upload OpenAPI Document", &body)
}

/// Feature switches that change what the viewer offers.
pub struct ViewerOptions {
    pub allow_version_deletion: bool,
    pub allow_version_download: bool,
    pub allow_custom_share_link: bool,
    pub generator_enabled: bool,
}

/// Behaviour of the viewer page. Document id and version label are read from
/// the `data-` attributes of `#viewer`, never interpolated into script text.
const VIEWER_SCRIPT: &str = r#"<script>
const viewer = document.getElementById('viewer').dataset;
const docId = encodeURIComponent(viewer.documentId);
const label = encodeURIComponent(viewer.version);
const docApi = '/api/document/' + docId;
const on = (id, event, handler) => {
  const el = document.getElementById(id);
  if (el) el.addEventListener(event, handler);
};
on('version-select', 'change', e => {
  location.href = '/view/' + docId + '?version=' + encodeURIComponent(e.target.value);
});
on('delete-version', 'click', () => {
  fetch(docApi + '/version/' + label, {method: 'DELETE'})
    .then(() => { location.href = '/view/' + docId; });
});
on('delete-document', 'click', () => {
  if (!confirm('Delete this document?')) return;
  fetch('/view/' + docId, {method: 'DELETE'})
    .then(() => { location.href = '/upload?message=Document%20deleted&type=success'; });
});
on('share-form', 'submit', e => {
  e.preventDefault();
  fetch(docApi + '/share', {
    method: 'POST',
    headers: {'Content-Type': 'application/json'},
    body: JSON.stringify({slug: e.target.slug.value}),
  }).then(r => r.json()).then(j => { if (j.url) location.reload(); else alert(j.error); });
});
const generator = document.getElementById('generator');
if (generator) {
  fetch('/api/generator/languages').then(r => r.json()).then(j => {
    (j.languages || []).forEach(l => {
      const o = document.createElement('option');
      o.value = l.name;
      o.textContent = l.displayName;
      generator.appendChild(o);
    });
  });
  on('generate-sdk', 'click', () => {
    fetch(docApi + '/generate/' + encodeURIComponent(generator.value) + '?version=' + label, {method: 'POST'})
      .then(r => r.json()).then(j => {
        const p = document.getElementById('sdk-result');
        p.textContent = '';
        if (j.link) {
          const a = document.createElement('a');
          a.href = '/api/generator/download?url=' + encodeURIComponent(j.link);
          a.textContent = 'Download SDK';
          p.appendChild(a);
        } else {
          p.textContent = j.error;
        }
      });
  });
}
SwaggerUIBundle({url: docApi + '/content?version=' + label, dom_id: '#swagger-ui'});
</script>"#;

/// `GET /view/{id}` page. `versions` is expected newest first.
pub fn viewer_page(
    doc: &Document,
    versions: &[Version],
    selected: &Version,
    message: &str,
    message_type: &str,
    options: &ViewerOptions,
) -> String {
    let id = html_escape(&doc.id);
    let label = html_escape(&selected.version);
    let version_options: String = versions
        .iter()
        .map(|v| {
            format!(
                "<option value=\"{label}\"{selected}>{label}{latest} &middot; {created}</option>",
                label = html_escape(&v.version),
                selected = if v.version == selected.version { " selected" } else { "" },
                latest = if v.is_latest { " (latest)" } else { "" },
                created = v.created_at.format("%Y-%m-%d %H:%M UTC"),
            )
        })
        .collect();

    let mut actions = String::new();
    if options.allow_version_download {
        let href = format!(
            "/api/document/{}/version/{}/download",
            urlencoding::encode(&doc.id),
            urlencoding::encode(&selected.version)
        );
        actions.push_str(&format!(
            "<a href=\"{}\">Download {}</a> ",
            html_escape(&href),
            label
        ));
    }
    if options.allow_version_deletion {
        actions.push_str(&format!(
            "<button type=\"button\" id=\"delete-version\">Delete {}</button> ",
            label
        ));
    }
    actions.push_str("<button type=\"button\" id=\"delete-document\">Delete document</button>");

    let share = match (&doc.share_slug, options.allow_custom_share_link) {
        (Some(slug), true) => {
            let href = format!("/share/{}", urlencoding::encode(slug));
            format!(
                "<p>Share link: <a href=\"{0}\">{0}</a></p>",
                html_escape(&href)
            )
        }
        (None, true) => concat!(
            "<form id=\"share-form\">",
            "<label for=\"slug\">Share link</label>",
            "<input id=\"slug\" name=\"slug\" placeholder=\"custom-slug (optional)\">",
            "<button type=\"submit\">Create share link</button></form>"
        )
        .to_string(),
        (_, false) => String::new(),
    };

    let generator = if options.generator_enabled {
        concat!(
            "<div class=\"card\"><h2>Generate SDK</h2>",
            "<select id=\"generator\"></select>",
            "<button type=\"button\" id=\"generate-sdk\">Generate</button>",
            "<p id=\"sdk-result\" class=\"muted\"></p></div>"
        )
    } else {
        ""
    };

    let body = format!(
        concat!(
            "{banner}<div class=\"card\" id=\"viewer\" data-document-id=\"{id}\" data-version=\"{label}\">",
            "<h1>{name}</h1><p>{description}</p>",
            "<p class=\"muted\">Document {id} &middot; expires {expires}</p>",
            "<label for=\"version-select\">Version</label>",
            "<select id=\"version-select\">{version_options}</select>",
            "<p>{actions}</p>{share}</div>",
            "{generator}",
            "<div class=\"card\"><div id=\"swagger-ui\"></div></div>",
            "<link rel=\"stylesheet\" href=\"https://unpkg.com/swagger-ui-dist@5/swagger-ui.css\">",
            "<script src=\"https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js\"></script>",
            "{script}"
        ),
        banner = banner(message, message_type),
        id = id,
        label = label,
        name = html_escape(&doc.name),
        description = html_escape(&doc.description),
        expires = doc.expires_at.format("%Y-%m-%d"),
        version_options = version_options,
        actions = actions,
        share = share,
        generator = generator,
        script = VIEWER_SCRIPT,
    );
    layout(&doc.name, &body)
}

/// Full error page with the given status.
pub fn error_page(status: StatusCode, title: &str, message: &str) -> Response {
    let body = format!(
        "<div class=\"card\"><h1>{}</h1><p>{}</p><p><a href=\"/upload\">Upload a document</a></p></div>",
        html_escape(title),
        html_escape(message)
    );
    (status, Html(layout(title, &body))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            html_escape(r#"<script>alert("x") & 'y'</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;) &amp; &#39;y&#39;&lt;/script&gt;"
        );
    }

    #[test]
    fn upload_page_shows_banner() {
        let page = upload_page("<b>hi</b>", "error", 50 * 1024 * 1024);
        assert!(page.contains("banner error"));
        assert!(page.contains("&lt;b&gt;hi&lt;/b&gt;"));
        assert!(page.contains("50 MB"));
    }

    fn sample_document(label: &str) -> (Document, Version) {
        let now = chrono::Utc::now();
        let version = Version {
            id: "ver1".into(),
            document_id: "abc".into(),
            version: label.into(),
            file_path: std::path::PathBuf::from("/tmp/abc/x.yaml"),
            created_at: now,
            is_latest: true,
        };
        let doc = Document {
            id: "abc".into(),
            name: "Pets".into(),
            description: String::new(),
            created_at: now,
            expires_at: now + chrono::Duration::days(30),
            is_active: true,
            share_slug: None,
            versions: vec![version.clone()],
        };
        (doc, version)
    }

    fn all_features() -> ViewerOptions {
        ViewerOptions {
            allow_version_deletion: true,
            allow_version_download: true,
            allow_custom_share_link: true,
            generator_enabled: true,
        }
    }

    #[test]
    fn labels_with_quotes_stay_out_of_scripts() {
        let label = "x');alert(document.cookie);('";
        let (doc, version) = sample_document(label);
        let page = viewer_page(&doc, &doc.versions, &version, "", "info", &all_features());

        assert!(!page.contains("onclick"));
        assert!(!page.contains("onchange"));
        let first_script = page.find("<script").unwrap();
        assert!(!page[first_script..].contains("document.cookie"));
        assert!(page.contains("data-version=\"x&#39;);alert(document.cookie);(&#39;\""));
        assert!(page.contains(
            "/api/document/abc/version/x%27%29%3Balert%28document.cookie%29%3B%28%27/download"
        ));
        // Only the fixed viewer script carries inline code.
        let inline_scripts = page.matches("<script>").count();
        assert_eq!(inline_scripts, 1);
        assert!(page.contains(VIEWER_SCRIPT));
    }

    #[test]
    fn labels_are_percent_encoded_in_links() {
        let (doc, version) = sample_document("release 1&2");
        let page = viewer_page(&doc, &doc.versions, &version, "", "info", &all_features());
        assert!(page.contains("href=\"/api/document/abc/version/release%201%262/download\""));
        assert!(page.contains("data-version=\"release 1&amp;2\""));
    }
}
