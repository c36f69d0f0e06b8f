use crate::config::SiteConfig;
use crate::types::{PipelineError, Result, RewrittenContent};
use crate::utils::{html::escape, text};
use chrono::{DateTime, Datelike, Utc};
use serde_json::json;
use std::path::PathBuf;
use tracing::debug;

/// Renders rewritten content into one servable HTML document per slug.
pub struct DocumentEmitter {
    site: SiteConfig,
}

impl DocumentEmitter {
    pub fn new(site: SiteConfig) -> Self {
        Self { site }
    }

    /// Where the document for `slug` lands: `<output_dir>/forum/<slug>/index.html`.
    pub fn document_path(&self, slug: &str) -> PathBuf {
        self.site.output_dir.join("forum").join(slug).join("index.html")
    }

    /// Renders and writes the document, overwriting an existing one with the same slug.
    pub async fn emit(
        &self,
        content: &RewrittenContent,
        slug: &str,
        published_at: DateTime<Utc>,
    ) -> Result<PathBuf> {
        let document = self.render(content, slug, published_at)?;
        let path = self.document_path(slug);

        let write = async {
            if let Some(dir) = path.parent() {
                tokio::fs::create_dir_all(dir).await?;
            }
            tokio::fs::write(&path, document).await
        };
        write
            .await
            .map_err(|e| PipelineError::Emit(format!("{}: {}", path.display(), e)))?;

        debug!("Wrote document {}", path.display());
        Ok(path)
    }

    pub fn render(
        &self,
        content: &RewrittenContent,
        slug: &str,
        published_at: DateTime<Utc>,
    ) -> Result<String> {
        let site = &self.site;
        let base_url = site.base_url.trim_end_matches('/');
        let url = site.document_url(slug);
        let published = published_at.to_rfc3339();
        let flat_body = content.body.split_whitespace().collect::<Vec<_>>().join(" ");
        let description = text::excerpt(&flat_body, 160);
        let title = escape(&content.title);

        let keywords = std::iter::once("politie nieuws".to_string())
            .chain(content.categories.iter().cloned())
            .chain(["politie forum".to_string(), "nederland".to_string()])
            .collect::<Vec<_>>()
            .join(", ");

        let categories_line = if content.categories.is_empty() {
            String::new()
        } else {
            format!("<span>{}</span>", escape(&content.categories.join(", ")))
        };

        Ok(format!(
            r#"<!DOCTYPE html>
<html lang="{lang}">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} | {site_name}</title>
    <meta name="description" content="{description}">
    <meta name="keywords" content="{keywords}">
    <meta name="author" content="{author}">
    <meta name="robots" content="index, follow">
    <link rel="canonical" href="{url}">
    <meta property="og:type" content="article">
    <meta property="og:title" content="{title}">
    <meta property="og:description" content="{description}">
    <meta property="og:url" content="{url}">
    <meta property="og:site_name" content="{site_name}">
    <meta property="article:published_time" content="{published}">
    <meta name="twitter:card" content="summary">
    <meta name="twitter:title" content="{title}">
    <meta name="twitter:description" content="{description}">
    <script type="application/ld+json">
{json_ld}
    </script>
</head>
<body>
    <header>
        <nav aria-label="Hoofdmenu">
            <a href="{base_url}/">Home</a>
            <a href="{base_url}/forum">Forum</a>
            <a href="{base_url}/categorieen">Categorieën</a>
            <a href="{base_url}/nieuws">Nieuws</a>
        </nav>
    </header>
    <main>
        <article>
            <nav aria-label="Breadcrumb">
                <ol>
                    <li><a href="{base_url}/">Home</a></li>
                    <li><a href="{base_url}/forum">Forum</a></li>
                    <li aria-current="page">{title}</li>
                </ol>
            </nav>
            <header>
                <h1>{title}</h1>
                <p><time datetime="{published}">{date}</time> <span>{author}</span> {categories_line}</p>
            </header>
            <div class="content">
{body}
            </div>
            <aside class="source">
                <p><strong>Originele bron:</strong> <a href="{source}" rel="noopener noreferrer">{source}</a></p>
            </aside>
            <section id="comments">
                <h2>Discussie</h2>
                <p><a href="{base_url}/">Log in</a> om te reageren.</p>
            </section>
        </article>
    </main>
    <footer>
        <p>&copy; {year} {site_name}</p>
    </footer>
</body>
</html>
"#,
            lang = escape(&site.locale),
            title = title,
            site_name = escape(&site.site_name),
            description = escape(&description),
            keywords = escape(&keywords),
            author = escape(&site.bot_user_name),
            url = escape(&url),
            published = published,
            json_ld = self.json_ld(content, &url, &published, &description)?,
            base_url = escape(base_url),
            date = published_at.format("%Y-%m-%d"),
            categories_line = categories_line,
            body = render_body(&content.body),
            source = escape(&content.source_link),
            year = Utc::now().year(),
        ))
    }

    fn json_ld(
        &self,
        content: &RewrittenContent,
        url: &str,
        published: &str,
        description: &str,
    ) -> Result<String> {
        let site = &self.site;
        let base_url = site.base_url.trim_end_matches('/');
        let graph = json!({
            "@context": "https://schema.org",
            "@graph": [
                {
                    "@type": "NewsArticle",
                    "headline": content.title,
                    "description": description,
                    "author": { "@type": "Organization", "name": site.bot_user_name, "url": base_url },
                    "publisher": { "@type": "Organization", "name": site.site_name },
                    "datePublished": published,
                    "dateModified": published,
                    "mainEntityOfPage": { "@type": "WebPage", "@id": url },
                    "articleBody": content.body,
                    "isBasedOn": content.source_link,
                    "keywords": content.categories,
                    "url": url,
                    "inLanguage": site.locale,
                    "isAccessibleForFree": true
                },
                {
                    "@type": "DiscussionForumPosting",
                    "headline": content.title,
                    "text": content.body,
                    "datePublished": published,
                    "author": { "@type": "Person", "name": site.bot_user_name },
                    "url": url,
                    "discussionUrl": format!("{}#comments", url),
                    "interactionStatistic": {
                        "@type": "InteractionCounter",
                        "interactionType": "https://schema.org/CommentAction",
                        "userInteractionCount": 0
                    }
                },
                {
                    "@type": "BreadcrumbList",
                    "itemListElement": [
                        { "@type": "ListItem", "position": 1, "name": "Home", "item": base_url },
                        { "@type": "ListItem", "position": 2, "name": "Forum", "item": format!("{}/forum", base_url) },
                        { "@type": "ListItem", "position": 3, "name": content.title, "item": url }
                    ]
                }
            ]
        });

        // "</" inside a script element would end it early.
        Ok(serde_json::to_string_pretty(&graph)?.replace("</", "<\\/"))
    }
}

/// Blank-line separated paragraphs; `# ` and `## ` lines become headings.
fn render_body(body: &str) -> String {
    body.split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(|block| {
            if let Some(heading) = block.strip_prefix("## ") {
                format!("                <h3>{}</h3>", render_inline(heading))
            } else if let Some(heading) = block.strip_prefix("# ") {
                format!("                <h2>{}</h2>", render_inline(heading))
            } else {
                let lines: Vec<String> = block.lines().map(|l| render_inline(l.trim())).collect();
                format!("                <p>{}</p>", lines.join("<br>\n"))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Escapes text and turns `[label](url)` into links.
fn render_inline(line: &str) -> String {
    let mut out = String::new();
    let mut rest = line;

    while let Some(open) = rest.find('[') {
        let after_open = &rest[open + 1..];
        let link = after_open.find("](").and_then(|close| {
            let target_start = close + 2;
            after_open[target_start..]
                .find(')')
                .map(|end| (close, target_start, target_start + end))
        });

        match link {
            Some((close, target_start, target_end)) => {
                let label = &after_open[..close];
                let target = &after_open[target_start..target_end];
                out.push_str(&escape(&rest[..open]));
                out.push_str(&format!(
                    r#"<a href="{}" rel="noopener noreferrer">{}</a>"#,
                    escape(target),
                    escape(label)
                ));
                rest = &after_open[target_end + 1..];
            }
            None => {
                out.push_str(&escape(&rest[..=open]));
                rest = after_open;
            }
        }
    }

    out.push_str(&escape(rest));
    out
}
