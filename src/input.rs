use anyhow::{bail, Context, Result};
use std::fs;
use std::path::PathBuf;

/// Where the target URLs come from: a single `--url` flag or a list file.
#[derive(Debug, Clone)]
pub enum InputSource {
    Url(String),
    File(PathBuf),
}

/// Load the target URLs, in order, with blank lines skipped.
///
/// An empty result is an error: the run is aborted before any remote call.
pub fn load_urls(source: &InputSource) -> Result<Vec<String>> {
    let urls = match source {
        InputSource::Url(url) => {
            let url = url.trim();
            if url.is_empty() {
                bail!("The --url value is empty");
            }
            check_url(url).context("Invalid --url value")?;
            vec![url.to_string()]
        }
        InputSource::File(path) => {
            if !path.exists() {
                bail!("Task file not found: {}", path.display());
            }
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Error reading {}", path.display()))?;

            let mut urls = Vec::new();
            for (number, line) in contents.lines().enumerate() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                check_url(line).with_context(|| {
                    format!("Invalid URL on line {} of {}", number + 1, path.display())
                })?;
                urls.push(line.to_string());
            }
            if urls.is_empty() {
                bail!("No URLs found in {}", path.display());
            }
            urls
        }
    };
    Ok(urls)
}

fn check_url(url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        bail!("{} does not look like an http(s) URL", url)
    }
}
