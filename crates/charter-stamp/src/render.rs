//! Text renderings of a stamp: a version-control trailer line, a comment
//! header for source files, and JSON.

use crate::error::Result;
use crate::stamp::Stamp;

/// Default trailer key.
pub const DEFAULT_TRAILER_TAG: &str = "Charter-Stamp";

/// Comment delimiters for a header block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentStyle {
    pub start: &'static str,
    pub mid: &'static str,
    pub end: &'static str,
}

impl CommentStyle {
    const HASH: Self = Self::uniform("# ");
    const SLASHES: Self = Self::uniform("// ");

    const fn uniform(prefix: &'static str) -> Self {
        Self {
            start: prefix,
            mid: prefix,
            end: prefix,
        }
    }

    /// The style for a language tag. Unknown languages use `#`.
    pub fn for_language(language: &str) -> Self {
        match language {
            "javascript" | "typescript" | "rust" | "go" => Self::SLASHES,
            "html" => Self {
                start: "<!-- ",
                mid: "  ",
                end: " -->",
            },
            "css" => Self {
                start: "/* ",
                mid: " * ",
                end: " */",
            },
            "sql" => Self::uniform("-- "),
            _ => Self::HASH,
        }
    }
}

fn prefix(s: &str, len: usize) -> &str {
    match s.char_indices().nth(len) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

/// One-line form for commit trailers.
///
/// `<tag>: v<version>:<node[:8]>:<tool ids joined by +>:<governed|ungoverned>:<charter[:8]|none>`
pub fn to_trailer(stamp: &Stamp, tag: &str) -> String {
    let tool_ids: Vec<&str> = stamp.tools.iter().map(|t| t.tool_id.as_str()).collect();
    let status = if stamp.governed { "governed" } else { "ungoverned" };
    let charter = stamp
        .charter_hash
        .map_or_else(|| "none".to_string(), |h| h.short(8));
    format!(
        "{}: v{}:{}:{}:{}:{}",
        tag,
        stamp.version,
        stamp.node.short(8),
        tool_ids.join("+"),
        status,
        charter
    )
}

/// Comment block for embedding at the top of a source file.
pub fn to_header(stamp: &Stamp, language: &str, tag: &str) -> String {
    let style = CommentStyle::for_language(language);
    let status = if stamp.governed { "GOVERNED" } else { "UNGOVERNED" };
    let tool_names: Vec<&str> = stamp.tools.iter().map(|t| t.name.as_str()).collect();
    let charter = stamp
        .charter_hash
        .map_or_else(|| "none".to_string(), |h| h.short(16));

    let content = [
        format!("Attribution: {}", status),
        format!("Node: {} ({}...)", stamp.alias, stamp.node.short(16)),
        format!("Tools: {}", tool_names.join(", ")),
        format!("Charter: {}...", prefix(&charter, 16)),
        format!("Time: {}", stamp.timestamp),
        to_trailer(stamp, tag),
    ];

    let mut lines = Vec::with_capacity(content.len() + 2);
    lines.push(format!("{}--- Charter Attribution ---", style.start));
    for line in content {
        lines.push(format!("{}{}", style.mid, line));
    }
    lines.push(format!("{}--- End Attribution ---", style.end));
    lines.join("\n")
}

/// The stamp verbatim, pretty-printed, fields in schema order.
pub fn to_json(stamp: &Stamp) -> Result<String> {
    Ok(serde_json::to_string_pretty(stamp)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stamp::{StampDraft, ToolFact};
    use charter_core::{Digest, EntryBuilder, PrivateSeed, PublicId};

    fn stamp(charter: Option<Digest>, tools: &[ToolFact]) -> Stamp {
        let node = PublicId::from_hex(
            "93921f61aabbccddeeff00112233445566778899aabbccddeeff001122334455",
        )
        .unwrap();
        let seed = PrivateSeed::from_bytes([0x42; 32]);
        let draft = StampDraft::assemble(node, "ada", charter, Some("general"), tools, None)
            .at("2025-01-15T10:00:00Z");
        let entry = EntryBuilder::genesis()
            .data(draft.chain_payload())
            .sign(&node, &seed);
        draft.seal(&entry, &seed).unwrap()
    }

    fn charter() -> Digest {
        Digest::from_hex("a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c6d7e8f90")
            .unwrap()
    }

    #[test]
    fn test_trailer() {
        let tools = [
            ToolFact::new("claude_code", "Claude Code", "Anthropic", true),
            ToolFact::new("cursor", "Cursor", "Anysphere", true),
        ];
        assert_eq!(
            to_trailer(&stamp(Some(charter()), &tools), DEFAULT_TRAILER_TAG),
            "Charter-Stamp: v1.0:93921f61:claude_code+cursor:governed:a1b2c3d4"
        );
    }

    #[test]
    fn test_trailer_ungoverned_without_charter() {
        let tools = [ToolFact::new("chatgpt", "ChatGPT", "OpenAI", false)];
        assert_eq!(
            to_trailer(&stamp(None, &tools), "X-Stamp"),
            "X-Stamp: v1.0:93921f61:chatgpt:ungoverned:none"
        );
    }

    #[test]
    fn test_header_python() {
        let tools = [ToolFact::new("claude_code", "Claude Code", "Anthropic", true)];
        let header = to_header(&stamp(Some(charter()), &tools), "python", DEFAULT_TRAILER_TAG);
        let lines: Vec<&str> = header.lines().collect();
        assert_eq!(
            lines,
            vec![
                "# --- Charter Attribution ---",
                "# Attribution: GOVERNED",
                "# Node: ada (93921f61aabbccdd...)",
                "# Tools: Claude Code",
                "# Charter: a1b2c3d4e5f60718...",
                "# Time: 2025-01-15T10:00:00Z",
                "# Charter-Stamp: v1.0:93921f61:claude_code:governed:a1b2c3d4",
                "# --- End Attribution ---",
            ]
        );
    }

    #[test]
    fn test_header_styles() {
        let s = stamp(None, &[]);
        let html = to_header(&s, "html", DEFAULT_TRAILER_TAG);
        assert!(html.starts_with("<!-- --- Charter Attribution ---"));
        assert!(html.ends_with(" -->--- End Attribution ---"));
        assert!(html.contains("\n  Charter: none..."));

        let css = to_header(&s, "css", DEFAULT_TRAILER_TAG);
        assert!(css.contains("\n * Attribution: UNGOVERNED"));

        assert!(to_header(&s, "rust", DEFAULT_TRAILER_TAG).starts_with("// "));
        assert!(to_header(&s, "sql", DEFAULT_TRAILER_TAG).starts_with("-- "));
        assert!(to_header(&s, "brainfuck", DEFAULT_TRAILER_TAG).starts_with("# "));
    }

    #[test]
    fn test_json_is_stamp_verbatim() {
        let s = stamp(Some(charter()), &[]);
        let json = to_json(&s).unwrap();
        let back: Stamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
        assert!(json.find("\"version\"").unwrap() < json.find("\"signature\"").unwrap());
    }
}
