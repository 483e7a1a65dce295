//! Site pages and include fragments as render targets.

use std::io;
use std::ops::Range;
use std::path::{Component, Path, PathBuf};

use regex::{Captures, Regex};
use tracing::{debug, warn};

use crate::error::{EventSiteError, EventSiteResult};
use crate::render::{Containers, Section};

const FRONT_MATTER: &str = r"\A---[ \t]*\r?\n(?s:.*?)\n---[ \t]*(?:\r?\n|\z)";
const INCLUDE_DIRECTIVE: &str = r"\{%\s*include\s+([^\s%}]+)\s*%\}";
/// A start or end tag. Quoted attribute values may contain `>`.
const TAG: &str = r#"(?i)<(/?)([a-z][a-z0-9-]*)\b((?:[^>"']|"[^"]*"|'[^']*')*?)(/?)>"#;
const ATTRIBUTE: &str = r#"([^\s"'=/>]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#;

/// Elements that never have a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// An HTML page being assembled for the site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    html: String,
}

impl Page {
    pub fn new(html: impl Into<String>) -> Self {
        Page { html: html.into() }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn into_html(self) -> String {
        self.html
    }

    /// Drop a leading `---` ... `---` front matter block. Returns whether
    /// one was present.
    pub fn strip_front_matter(&mut self) -> EventSiteResult<bool> {
        let front_matter = pattern(FRONT_MATTER)?;
        let Some(range) = front_matter.find(&self.html).map(|m| m.range()) else {
            return Ok(false);
        };
        self.html.replace_range(range, "");
        Ok(true)
    }

    /// Replace `{% include name %}` directives with files from `dir`.
    ///
    /// Missing includes are replaced by an HTML comment and their names are
    /// returned.
    pub fn expand_includes(&mut self, dir: &Path) -> EventSiteResult<Vec<String>> {
        let directive = pattern(INCLUDE_DIRECTIVE)?;
        let mut missing = Vec::new();

        let expanded = directive.replace_all(&self.html, |caps: &Captures| {
            let name = &caps[1];
            match read_include(dir, name) {
                Some(content) => {
                    debug!(include = name, "Included fragment");
                    content
                }
                None => {
                    warn!(include = name, "Include file not found");
                    missing.push(name.to_string());
                    format!("<!-- Include file not found: {name} -->")
                }
            }
        });

        self.html = expanded.into_owned();
        Ok(missing)
    }

    /// Byte range of the content of the element with `id="{id}"`.
    fn container(&self, id: &str) -> EventSiteResult<Option<Range<usize>>> {
        let tags = pattern(TAG)?;
        let attributes = pattern(ATTRIBUTE)?;

        // Element name and content start once the container is open
        let mut open: Option<(String, usize)> = None;
        let mut depth = 0usize;

        for caps in tags.captures_iter(&self.html) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let name = caps[2].to_ascii_lowercase();
            let closing = &caps[1] == "/";
            let empty = &caps[4] == "/" || VOID_ELEMENTS.contains(&name.as_str());

            match &open {
                None => {
                    if closing || !has_id(&attributes, &caps[3], id) {
                        continue;
                    }
                    if empty {
                        return Ok(None);
                    }
                    open = Some((name, whole.end()));
                    depth = 1;
                }
                Some((tag, start)) => {
                    if name != *tag {
                        continue;
                    }
                    if closing {
                        depth -= 1;
                        if depth == 0 {
                            return Ok(Some(*start..whole.start()));
                        }
                    } else if !empty {
                        depth += 1;
                    }
                }
            }
        }

        if open.is_some() {
            warn!(container = id, "Container element is never closed");
        }
        Ok(None)
    }
}

impl Containers for Page {
    fn contains(&self, id: &str) -> EventSiteResult<bool> {
        Ok(self.container(id)?.is_some())
    }

    fn fill(&mut self, id: &str, html: &str) -> EventSiteResult<()> {
        let range = self.container(id)?.ok_or_else(|| {
            EventSiteError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("page has no element with id \"{id}\""),
            ))
        })?;

        self.html.replace_range(range, &format!("\n{html}"));
        Ok(())
    }
}

/// The site's include directory. Each section is written to its own
/// fragment file for pages that pull the listings in client-side.
#[derive(Debug, Clone)]
pub struct IncludeDir {
    dir: PathBuf,
}

impl IncludeDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        IncludeDir { dir: dir.into() }
    }

    pub fn path_for(&self, section: Section) -> PathBuf {
        self.dir.join(section.include_file())
    }
}

impl Containers for IncludeDir {
    fn contains(&self, id: &str) -> EventSiteResult<bool> {
        Ok(Section::from_container_id(id).is_some())
    }

    fn fill(&mut self, id: &str, html: &str) -> EventSiteResult<()> {
        let section = Section::from_container_id(id).ok_or_else(|| {
            EventSiteError::Config(format!("no include fragment for container \"{id}\""))
        })?;

        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(section), html)?;
        Ok(())
    }
}

fn pattern(source: &str) -> EventSiteResult<Regex> {
    Regex::new(source)
        .map_err(|e| EventSiteError::Config(format!("internal pattern failed to compile: {e}")))
}

/// Whether an attribute list carries `id="{id}"`.
fn has_id(attributes: &Regex, list: &str, id: &str) -> bool {
    attributes.captures_iter(list).any(|caps| {
        caps[1].eq_ignore_ascii_case("id")
            && caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .is_some_and(|value| value.as_str() == id)
    })
}

/// Read `dir/name`, refusing names that would leave `dir`.
fn read_include(dir: &Path, name: &str) -> Option<String> {
    let relative = Path::new(name);
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return None;
    }
    std::fs::read_to_string(dir.join(relative)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"<!DOCTYPE html>
<html>
<body>
  <div id="upcoming-events" class="events">
    <div class="loading"><p>Loading...</p></div>
  </div>
  <section>
    <div id='past-events'><br/></div>
  </section>
</body>
</html>
"#;

    #[test]
    fn test_front_matter_is_removed() {
        let mut page = Page::new("---\nlayout: default\ntitle: Events\n---\n<h1>Events</h1>\n");
        assert!(page.strip_front_matter().unwrap());
        assert_eq!(page.html(), "<h1>Events</h1>\n");
    }

    #[test]
    fn test_page_without_front_matter_is_untouched() {
        let mut page = Page::new("<h1>Events</h1>\n<hr>\n---\n");
        assert!(!page.strip_front_matter().unwrap());
        assert_eq!(page.html(), "<h1>Events</h1>\n<hr>\n---\n");
    }

    #[test]
    fn test_includes_are_expanded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("header.html"), "<header>Group</header>").unwrap();
        let mut page = Page::new("{% include header.html %}\n<main>{%include  footer.html%}</main>");

        let missing = page.expand_includes(dir.path()).unwrap();

        assert_eq!(missing, vec!["footer.html".to_string()]);
        assert_eq!(
            page.html(),
            "<header>Group</header>\n<main><!-- Include file not found: footer.html --></main>"
        );
    }

    #[test]
    fn test_includes_cannot_escape_directory() {
        let outer = tempfile::tempdir().unwrap();
        let dir = outer.path().join("_includes");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(outer.path().join("secret.txt"), "secret").unwrap();
        let mut page = Page::new("{% include ../secret.txt %}");

        let missing = page.expand_includes(&dir).unwrap();

        assert_eq!(missing, vec!["../secret.txt".to_string()]);
        assert_eq!(page.html(), "<!-- Include file not found: ../secret.txt -->");
    }

    #[test]
    fn test_container_lookup_matches_nested_closing_tag() {
        let mut page = Page::new(INDEX);
        assert!(page.contains("upcoming-events").unwrap());

        page.fill("upcoming-events", "<p>filled</p>\n").unwrap();

        assert!(page.html().contains(
            "<div id=\"upcoming-events\" class=\"events\">\n<p>filled</p>\n</div>\n  <section>"
        ));
        assert!(!page.html().contains("Loading..."));
    }

    #[test]
    fn test_single_quoted_id_and_self_closing_children() {
        let mut page = Page::new(INDEX);
        page.fill("past-events", "<p>past</p>\n").unwrap();
        assert!(page.html().contains("<div id='past-events'>\n<p>past</p>\n</div>"));
    }

    #[test]
    fn test_missing_container() {
        let mut page = Page::new("<div data-id=\"upcoming-events\"></div>");
        assert!(!page.contains("upcoming-events").unwrap());
        assert!(page.fill("upcoming-events", "x").is_err());
    }

    #[test]
    fn test_quoted_attribute_values_may_contain_angle_brackets() {
        let mut page = Page::new(concat!(
            r#"<div title="a > b" id="upcoming-events">"#,
            r#"<div title='x > <div>'><p>Loading...</p></div>"#,
            "</div><footer>kept</footer>",
        ));

        page.fill("upcoming-events", "<p>filled</p>\n").unwrap();

        assert_eq!(
            page.html(),
            "<div title=\"a > b\" id=\"upcoming-events\">\n<p>filled</p>\n</div><footer>kept</footer>"
        );
    }

    #[test]
    fn test_id_inside_another_attribute_is_not_a_match() {
        let page = Page::new(r#"<div title=' id="upcoming-events"'></div><p ID=upcoming-events>x</p>"#);

        let range = page.container("upcoming-events").unwrap().unwrap();
        assert_eq!(&page.html()[range], "x");
    }

    #[test]
    fn test_include_dir_writes_section_fragments() {
        let dir = tempfile::tempdir().unwrap();
        let mut includes = IncludeDir::new(dir.path().join("_includes"));

        assert!(includes.contains("past-events").unwrap());
        assert!(!includes.contains("sidebar").unwrap());
        includes.fill("past-events", "<p>past</p>\n").unwrap();

        let written = std::fs::read_to_string(includes.path_for(Section::Past)).unwrap();
        assert_eq!(written, "<p>past</p>\n");
    }
}
