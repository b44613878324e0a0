pub mod query;

use anyhow::Result;
use clap::{Arg, ArgMatches, Command, CommandFactory};
use entrez_client::{ClientConfig, EntrezClient, QueryParameters, Tool};

use crate::Cli;

pub use query::execute;

pub fn create_entrez_client(cli: &Cli) -> Result<EntrezClient> {
    let mut config = ClientConfig::new().with_tool(&cli.tool_id);

    if let Some(key) = &cli.api_key {
        config = config.with_api_key(key);
    }

    if let Some(email) = &cli.email {
        config = config.with_email(email);
    }

    if let Some(batch_size) = cli.batch_size {
        config = config.with_batch_size(batch_size);
    }

    Ok(EntrezClient::with_config(config)?)
}

fn about(tool: Tool) -> &'static str {
    match tool {
        Tool::Info => "List databases, or describe the fields and links of one database (einfo)",
        Tool::Search => "Search a database and return matching UIDs (esearch)",
        Tool::Post => "Upload a list of UIDs to the history server (epost)",
        Tool::Summary => "Document summaries for UIDs (esummary)",
        Tool::Fetch => "Full records for UIDs in the requested format (efetch)",
        Tool::Link => "Related UIDs in the same or another database (elink)",
        Tool::GQuery => "Number of hits for a term in every database (egquery)",
        Tool::Spell => "Spelling suggestions for a search term (espell)",
        Tool::CitMatch => "PubMed IDs for citation strings (ecitmatch)",
    }
}

fn tool_command(tool: Tool) -> Command {
    let spec = tool.spec();
    let required = spec.required.iter().map(|name| (*name, true));
    let optional = spec.optional.iter().map(|name| (*name, false));

    required.chain(optional).fold(
        Command::new(spec.name)
            .about(about(tool))
            .visible_alias(format!("e{}", spec.name)),
        |command, (name, required)| {
            let help = if required {
                format!("`{name}` parameter (required)")
            } else {
                format!("`{name}` parameter")
            };
            command.arg(Arg::new(name).long(name).value_name("VALUE").help(help))
        },
    )
}

/// Top-level command with one subcommand per E-utility
pub fn build_cli() -> Command {
    Tool::ALL
        .into_iter()
        .fold(Cli::command(), |cli, tool| cli.subcommand(tool_command(tool)))
}

/// Parameters given as tool flags plus the `--param` pass-through ones
pub fn tool_params(tool: Tool, matches: &ArgMatches, extra: &[(String, String)]) -> QueryParameters {
    let spec = tool.spec();
    let mut params: QueryParameters = spec
        .required
        .iter()
        .chain(spec.optional)
        .filter_map(|name| matches.get_one::<String>(name).map(|value| (*name, value.clone())))
        .collect();
    params.extend(extra.iter().cloned());
    params
}
