//! Interactive browser over a parsed response

use std::io::{self, BufRead, Write};

use entrez_client::Node;

const HELP: &str = "\
  <key>   enter an entry (or an index of a list)
  ..      go up one level
  /       go back to the top
  json    print the current level as JSON
  q       quit";

const PREVIEW_CHARS: usize = 60;

fn preview(node: &Node) -> String {
    match node {
        Node::Scalar(text) => {
            let text = text.trim();
            if text.chars().count() > PREVIEW_CHARS {
                format!("{:?}...", text.chars().take(PREVIEW_CHARS).collect::<String>())
            } else {
                format!("{text:?}")
            }
        }
        Node::Sequence(items) => format!("[{} items]", items.len()),
        Node::Mapping(mapping) if mapping.len() == 1 => {
            format!("{{{}}}", mapping.keys().next().unwrap_or_default())
        }
        Node::Mapping(mapping) => format!("{{{} entries}}", mapping.len()),
    }
}

fn show<W: Write>(node: &Node, out: &mut W) -> io::Result<()> {
    match node {
        Node::Scalar(text) => writeln!(out, "{text}"),
        Node::Sequence(items) => {
            for (index, item) in items.iter().enumerate() {
                writeln!(out, "  {index:>4}  {}", preview(item))?;
            }
            Ok(())
        }
        Node::Mapping(mapping) => {
            for (key, value) in mapping.iter() {
                writeln!(out, "  {key}  {}", preview(value))?;
            }
            Ok(())
        }
    }
}

/// Run [`browse`] on the blocking pool so the calling task can still be cancelled
pub async fn browse_in_background<R, W>(root: Node, input: R, out: W) -> anyhow::Result<()>
where
    R: BufRead + Send + 'static,
    W: Write + Send + 'static,
{
    tokio::task::spawn_blocking(move || browse(&root, input, out)).await??;
    Ok(())
}

/// Navigate `root` with commands read from `input` until `q` or end of input
pub fn browse<R: BufRead, W: Write>(root: &Node, mut input: R, mut out: W) -> io::Result<()> {
    let mut path: Vec<String> = Vec::new();
    writeln!(out, "Type `help` for commands.")?;
    show(root, &mut out)?;

    loop {
        write!(out, "/{}> ", path.join("/"))?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            return Ok(());
        }

        match line.trim() {
            "q" | "quit" | "exit" => return Ok(()),
            "help" | "?" => {
                writeln!(out, "{HELP}")?;
                continue;
            }
            "json" => {
                let current = root.select(&path.join(" ")).unwrap_or(root);
                let json = current.to_json_pretty().map_err(io::Error::other)?;
                writeln!(out, "{json}")?;
                continue;
            }
            "" | "ls" => {}
            ".." => {
                path.pop();
            }
            "/" => path.clear(),
            step => {
                let mut candidate = path.clone();
                candidate.extend(step.split_whitespace().map(str::to_string));
                if root.select(&candidate.join(" ")).is_none() {
                    writeln!(out, "No entry `{step}` here")?;
                    continue;
                }
                path = candidate;
            }
        }

        show(root.select(&path.join(" ")).unwrap_or(root), &mut out)?;
    }
}
