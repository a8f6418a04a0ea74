//! Parse collaborator.
//!
//! Splits raw markdown into frontmatter metadata and body. The header between
//! the `---` delimiters is read as a YAML mapping with `serde_yaml`.

use crate::content::Metadata;
use crate::error::ContentError;

pub trait DocumentParser: Send + Sync {
    fn parse(&self, raw: &str) -> Result<(Metadata, String), ContentError>;
}

const DELIMITER: &str = "---";

#[derive(Debug, Clone, Copy, Default)]
pub struct FrontmatterParser;

impl DocumentParser for FrontmatterParser {
    fn parse(&self, raw: &str) -> Result<(Metadata, String), ContentError> {
        let text = raw.trim_start_matches('\u{feff}');
        let mut lines = text.split_inclusive('\n');

        let header_start = match lines.next() {
            Some(first) if first.trim_end() == DELIMITER => first.len(),
            _ => return Ok((Metadata::new(), text.to_string())),
        };

        let mut header_end = header_start;
        let mut body_start = None;
        for line in lines {
            if line.trim_end() == DELIMITER {
                body_start = Some(header_end + line.len());
                break;
            }
            header_end += line.len();
        }
        let Some(body_start) = body_start else {
            return Err(ContentError::Parse("unterminated frontmatter".to_string()));
        };

        let metadata = parse_header(&text[header_start..header_end])?;
        let body = text[body_start..].trim_start_matches(['\r', '\n']).to_string();
        Ok((metadata, body))
    }
}

fn parse_header(header: &str) -> Result<Metadata, ContentError> {
    if header.trim().is_empty() {
        return Ok(Metadata::new());
    }
    Ok(serde_yaml::from_str(header)?)
}
