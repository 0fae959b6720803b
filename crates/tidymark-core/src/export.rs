//! Bulk export formats.
//!
//! - Netscape bookmark file (the `<!DOCTYPE NETSCAPE-Bookmark-file-1>` HTML
//!   every browser imports)
//! - Plain JSON mirror of the source tree
//!
//! A flat record list can be turned back into a folder tree with
//! [`records_to_tree`] before exporting.

use crate::defaults::FOLDER_PATH_SEPARATOR;
use crate::error::Result;
use crate::models::{BookmarkNode, BookmarkRecord};

const NETSCAPE_HEADER: &str = "<!DOCTYPE NETSCAPE-Bookmark-file-1>\n\
<!-- This is an automatically generated file.\n     \
It will be read and overwritten.\n     \
DO NOT EDIT! -->\n\
<META HTTP-EQUIV=\"Content-Type\" CONTENT=\"text/html; charset=UTF-8\">\n\
<TITLE>Bookmarks</TITLE>\n\
<H1>Bookmarks</H1>\n";

/// Render a tree as a Netscape bookmark file.
///
/// Untitled root folders are transparent: their children are written at the
/// level the root would have occupied.
pub fn to_netscape_html(nodes: &[BookmarkNode]) -> String {
    let mut html = String::from(NETSCAPE_HEADER);
    html.push_str("<DL><p>\n");
    write_nodes(&mut html, nodes, 1);
    html.push_str("</DL><p>\n");
    html
}

fn write_nodes(out: &mut String, nodes: &[BookmarkNode], depth: usize) {
    let indent = "    ".repeat(depth);

    for node in nodes {
        if let Some(url) = &node.url {
            let add_date = node
                .date_added
                .map(|ms| (ms / 1000).to_string())
                .unwrap_or_default();
            let label = if node.title.is_empty() {
                url.as_str()
            } else {
                node.title.as_str()
            };
            out.push_str(&format!(
                "{indent}<DT><A HREF=\"{}\" ADD_DATE=\"{add_date}\">{}</A>\n",
                escape_html(url),
                escape_html(label)
            ));
        } else if let Some(children) = &node.children {
            if node.title.is_empty() && node.parent_id.is_none() {
                write_nodes(out, children, depth);
                continue;
            }
            let add_date = node.date_added.unwrap_or(0) / 1000;
            out.push_str(&format!(
                "{indent}<DT><H3 ADD_DATE=\"{add_date}\">{}</H3>\n",
                escape_html(&node.title)
            ));
            out.push_str(&format!("{indent}<DL><p>\n"));
            write_nodes(out, children, depth + 1);
            out.push_str(&format!("{indent}</DL><p>\n"));
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Pretty-printed JSON mirror of the tree.
pub fn to_json_tree(nodes: &[BookmarkNode]) -> Result<String> {
    Ok(serde_json::to_string_pretty(nodes)?)
}

/// Rebuild a folder/link tree from flat records by splitting `folder_path`.
///
/// Folders appear in first-seen order and get synthetic `folder:<path>` ids.
/// Records with an empty path land at the top level.
pub fn records_to_tree(records: &[BookmarkRecord]) -> Vec<BookmarkNode> {
    let mut roots: Vec<BookmarkNode> = Vec::new();

    for record in records {
        let segments: Vec<&str> = record
            .folder_path
            .split(FOLDER_PATH_SEPARATOR)
            .filter(|s| !s.is_empty())
            .collect();
        let mut path = String::new();
        let folder = descend(&mut roots, &segments, &mut path);

        let mut link = BookmarkNode::link(&record.id, &record.title, &record.url);
        link.date_added = record.date_added;
        link.parent_id = record.parent_id.clone();
        folder.push(link);
    }

    roots
}

fn descend<'a>(
    nodes: &'a mut Vec<BookmarkNode>,
    segments: &[&str],
    path: &mut String,
) -> &'a mut Vec<BookmarkNode> {
    let Some((first, rest)) = segments.split_first() else {
        return nodes;
    };

    if !path.is_empty() {
        path.push_str(FOLDER_PATH_SEPARATOR);
    }
    path.push_str(first);

    let pos = match nodes
        .iter()
        .position(|n| n.is_folder() && n.title == *first)
    {
        Some(pos) => pos,
        None => {
            nodes.push(BookmarkNode::folder(format!("folder:{path}"), *first));
            nodes.len() - 1
        }
    };

    let children = nodes[pos].children.get_or_insert_with(Vec::new);
    descend(children, rest, path)
}
