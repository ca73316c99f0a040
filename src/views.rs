use maud::{DOCTYPE, Markup, PreEscaped, html};

use crate::models::entries::{Breadcrumb, FileCategory, ListingResponse};

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; background: #f4f5f7; color: #222; }
header { background: #1f2933; color: #fff; padding: 0.75rem 1rem; }
header a { color: #9fd3ff; text-decoration: none; }
main { max-width: 60rem; margin: 0 auto; padding: 1rem; }
table { width: 100%; border-collapse: collapse; background: #fff; }
td { padding: 0.4rem 0.6rem; border-bottom: 1px solid #e4e7eb; }
td.size { text-align: right; white-space: nowrap; color: #616e7c; }
.storage { margin: 0.5rem 0 1rem; font-size: 0.9rem; color: #52606d; }
.bar { height: 0.4rem; background: #e4e7eb; border-radius: 0.2rem; overflow: hidden; }
.bar span { display: block; height: 100%; background: #3e7bfa; }
.actions { display: flex; gap: 1rem; flex-wrap: wrap; margin-bottom: 1rem; }
.error { text-align: center; padding: 4rem 1rem; }
"#;

const SCRIPT: &str = r#"
async function postForm(url, init) {
  const response = await fetch(url, init);
  const data = await response.json().catch(() => ({ error: response.statusText }));
  if (!response.ok || data.error) { alert(data.error || 'Request failed'); return; }
  window.location.reload();
}
document.getElementById('upload-form').addEventListener('submit', (event) => {
  event.preventDefault();
  const form = event.target;
  postForm('/upload/' + form.dataset.path, { method: 'POST', body: new FormData(form) });
});
document.getElementById('mkdir-form').addEventListener('submit', (event) => {
  event.preventDefault();
  const form = event.target;
  postForm('/mkdir/' + form.dataset.path, {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify({ name: new FormData(form).get('name') }),
  });
});
"#;

/// `Home` followed by one crumb per segment of `subpath`.
pub fn breadcrumbs(subpath: &str) -> Vec<Breadcrumb> {
    let mut crumbs = vec![Breadcrumb {
        name: "Home".into(),
        path: String::new(),
    }];
    let parts: Vec<&str> = subpath.split('/').filter(|part| !part.is_empty()).collect();
    for (index, part) in parts.iter().enumerate() {
        crumbs.push(Breadcrumb {
            name: (*part).to_string(),
            path: parts[..=index].join("/"),
        });
    }
    crumbs
}

pub fn encode_path(path: &str) -> String {
    path.split('/')
        .filter(|part| !part.is_empty())
        .map(|part| urlencoding::encode(part).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

fn icon(category: Option<FileCategory>, is_dir: bool) -> &'static str {
    if is_dir {
        return "📁";
    }
    match category {
        Some(FileCategory::Video) => "🎬",
        Some(FileCategory::Audio) => "🎵",
        Some(FileCategory::Image) => "🖼",
        Some(FileCategory::Document) => "📄",
        _ => "📦",
    }
}

fn layout(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
                style { (PreEscaped(STYLE)) }
            }
            body {
                header { a href="/browse/" { "Media Hub" } }
                main { (content) }
            }
        }
    }
}

pub fn listing_page(listing: &ListingResponse) -> Markup {
    let current = encode_path(&listing.path);
    let title = listing
        .breadcrumbs
        .last()
        .map(|crumb| crumb.name.as_str())
        .unwrap_or("Home");

    layout(
        title,
        html! {
            nav {
                @for (index, crumb) in listing.breadcrumbs.iter().enumerate() {
                    @if index > 0 { " / " }
                    a href={ "/browse/" (encode_path(&crumb.path)) } { (crumb.name) }
                }
            }
            @match &listing.storage {
                Some(storage) => {
                    div.storage {
                        (storage.used) " used of " (storage.total) " (" (storage.free) " free, "
                        (storage.percent) "%)"
                        div.bar { span style={ "width: " (storage.percent) "%" } {} }
                    }
                }
                None => { div.storage { "Storage information unavailable" } }
            }
            div.actions {
                form id="upload-form" data-path=(current) {
                    input type="file" name="file" required;
                    button type="submit" { "Upload" }
                }
                form id="mkdir-form" data-path=(current) {
                    input type="text" name="name" placeholder="New folder" required;
                    button type="submit" { "Create folder" }
                }
            }
            table {
                @if listing.entries.is_empty() {
                    tr { td { "This folder is empty" } }
                }
                @for entry in &listing.entries {
                    @let target = encode_path(&join_path(&listing.path, &entry.name));
                    tr data-kind=(entry.category.map_or("folder", |category| category.as_str())) {
                        td { (icon(entry.category, entry.is_dir)) }
                        td {
                            @if entry.is_dir {
                                a href={ "/browse/" (target) } { (entry.name) }
                            } @else {
                                a href={ "/stream/" (target) } { (entry.name) }
                            }
                        }
                        td.size { (entry.size_human.as_deref().unwrap_or("")) }
                        td {
                            @if !entry.is_dir {
                                a href={ "/download/" (target) } { "Download" }
                            }
                        }
                    }
                }
            }
            script { (PreEscaped(SCRIPT)) }
        },
    )
}

pub fn error_page(code: u16, message: &str) -> Markup {
    layout(
        &format!("{code} {message}"),
        html! {
            div.error {
                h1 { (code) }
                p { (message) }
                a href="/browse/" { "Back to files" }
            }
        },
    )
}
