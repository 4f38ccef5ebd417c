/// Renderers for scan trees: indented text and flattened CSV.
use std::io::{self, Write};

use serde::Serialize;
use spacelens_core::model::size::format_size;
use spacelens_core::model::{Node, NodeKind};

/// Serialize `value` as pretty JSON followed by a newline.
pub fn write_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Indented tree, one node per line: size, then name. Directories end in
/// `/`, synthetic nodes are bracketed.
pub fn write_tree<W: Write>(out: &mut W, root: &Node) -> io::Result<()> {
    write_tree_level(out, root, 0)
}

fn write_tree_level<W: Write>(out: &mut W, node: &Node, level: usize) -> io::Result<()> {
    let label = match node.kind {
        kind if kind.is_synthetic() => format!("[{}]", node.name),
        NodeKind::Directory if level > 0 => format!("{}/", node.name),
        _ => node.name.to_string(),
    };
    writeln!(
        out,
        "{:>10}  {}{}",
        format_size(node.size_bytes),
        "  ".repeat(level),
        label
    )?;
    for child in &node.children {
        write_tree_level(out, child, level + 1)?;
    }
    Ok(())
}

#[derive(Serialize)]
struct CsvRow<'a> {
    path: &'a str,
    name: &'a str,
    kind: NodeKind,
    size_bytes: u64,
    depth: usize,
    extension: Option<&'a str>,
    item_count: Option<u64>,
}

/// Flatten the tree into CSV rows in pre-order, with a header line.
pub fn write_csv<W: Write>(out: W, root: &Node) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    let mut stack = vec![(root, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        writer.serialize(CsvRow {
            path: &node.absolute_path,
            name: &node.name,
            kind: node.kind,
            size_bytes: node.size_bytes,
            depth,
            extension: node.extension.as_deref(),
            item_count: node.item_count,
        })?;
        stack.extend(node.children.iter().rev().map(|c| (c, depth + 1)));
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn sample() -> Node {
        let root = Path::new("/data");
        let docs = Node::directory(
            &root.join("docs"),
            vec![Node::file(&root.join("docs/a.pdf"), 4096)],
            false,
        );
        Node::directory(
            root,
            vec![
                docs,
                Node::file(&root.join("b.txt"), 2048),
                Node::protected_gap(root, 50, 1),
                Node::truncated(root, 100, 3),
            ],
            true,
        )
    }

    #[test]
    fn tree_indents_children() {
        let mut buf = Vec::new();
        write_tree(&mut buf, &sample()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[0].ends_with("  data"));
        assert!(lines[1].ends_with("    docs/"));
        assert!(lines[2].ends_with("      a.pdf"));
        assert!(lines[4].ends_with("  [Protected data (1 restricted)]"));
        assert!(lines[5].ends_with("  [3 more items]"));
        assert!(lines[2].contains("4.0 KB"));
    }

    #[test]
    fn csv_flattens_in_preorder() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &sample()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "path,name,kind,size_bytes,depth,extension,item_count"
        );
        assert_eq!(lines.len(), 7);
        assert!(lines[1].starts_with("/data,data,directory,6294,0,"));
        assert!(lines[2].starts_with("/data/docs,docs,directory,4096,1,"));
        assert_eq!(lines[3], "/data/docs/a.pdf,a.pdf,file,4096,2,pdf,");
        assert_eq!(lines[6], "/data,3 more items,truncated,100,1,,3");
    }

    #[test]
    fn json_ends_with_newline() {
        let mut buf = Vec::new();
        write_json(&mut buf, &sample()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.ends_with("}\n"));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["sizeBytes"], 6294);
    }
}
