use std::fs::File;
use std::io::{self, BufReader, BufWriter, IsTerminal, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::ArgMatches;
use entrez_client::{Lines, Tool, xml};
use futures_util::TryStreamExt;

use super::{create_entrez_client, tool_params};
use crate::Cli;
use crate::browse;

/// Run the tool selected on the command line and write its output
pub async fn execute(cli: &Cli, matches: &ArgMatches) -> Result<()> {
    let (name, sub_matches) = matches.subcommand().context("no E-utility given")?;
    let tool: Tool = name.parse()?;
    let params = tool_params(tool, sub_matches, &cli.params);
    let client = create_entrez_client(cli)?;

    let lines = match &cli.on_search {
        Some(term) => {
            let search_db = cli
                .search_db
                .clone()
                .or_else(|| params.get("db").map(str::to_string))
                .context("--on-search needs --search-db or --db")?;
            tracing::info!(term = %term, db = %search_db, tool = %tool, "Running tool on search results");
            client.on_search(term, &search_db, name, params, None).await?
        }
        None => client.paginated_query(name, params)?,
    };

    if !cli.parse_xml {
        let mut out = open_output(cli.output.as_deref())?;
        return write_lines(lines, &mut out).await;
    }

    let tree = xml::collect_lines(lines).await?;
    match &cli.output {
        None if io::stdout().is_terminal() => {
            browse::browse_in_background(tree, BufReader::new(io::stdin()), io::stdout()).await?;
        }
        output => {
            let mut out = open_output(output.as_deref())?;
            writeln!(out, "{}", tree.to_json_pretty()?)?;
            out.flush()?;
        }
    }
    Ok(())
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

/// Copy every line to `out` as it arrives
pub async fn write_lines<W: Write + ?Sized>(mut lines: Lines, out: &mut W) -> Result<()> {
    while let Some(line) = lines.try_next().await? {
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}
