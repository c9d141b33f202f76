//! Terminal rendering of compiled queries and the feature registry

use crate::query::{
    CompiledQuery, KeywordGrammar, NamespaceScope, QueryBuildContext, SiteQuery, ValueMode,
};
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

fn color_choice(color: bool) -> ColorChoice {
    if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

/// Print a section label
fn label(stdout: &mut StandardStream, text: &str) -> io::Result<()> {
    stdout.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)).set_bold(true))?;
    write!(stdout, "{text}")?;
    stdout.reset()?;
    Ok(())
}

/// Print a compiled query in human-readable form
pub fn print_compiled(compiled: &CompiledQuery, color: bool) -> io::Result<()> {
    let mut stdout = StandardStream::stdout(color_choice(color));

    label(&mut stdout, "residual: ")?;
    writeln!(stdout, "{:?}", compiled.residual)?;

    label(&mut stdout, "strategy: ")?;
    writeln!(stdout, "{:?}", compiled.strategy)?;

    if !compiled.nodes.is_empty() {
        label(&mut stdout, "keywords:")?;
        writeln!(stdout)?;
        for node in &compiled.nodes {
            write!(stdout, "  ")?;
            if node.negated {
                stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
                write!(stdout, "-")?;
            }
            stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
            write!(stdout, "{}", node.key)?;
            stdout.reset()?;
            writeln!(stdout, ":{} => {}", node.quoted_value, node.parsed_summary)?;
        }
    }

    print_site(&mut stdout, &compiled.host)?;
    for site in &compiled.sister_sites {
        print_site(&mut stdout, site)?;
    }

    Ok(())
}

fn print_site(stdout: &mut StandardStream, site: &SiteQuery) -> io::Result<()> {
    writeln!(stdout)?;
    stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
    writeln!(stdout, "[{}]", site.site)?;
    stdout.reset()?;

    let ctx: &QueryBuildContext = &site.context;
    if !ctx.results_possible() {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        writeln!(stdout, "no results possible")?;
        stdout.reset()?;
    }

    label(stdout, "search type: ")?;
    writeln!(stdout, "{}", ctx.search_type())?;

    label(stdout, "filter: ")?;
    let filter = serde_json::to_string_pretty(&site.backend_filter()).map_err(io::Error::other)?;
    writeln!(stdout, "{filter}")?;

    match ctx.required_namespaces() {
        Some(NamespaceScope::All) => {
            label(stdout, "namespaces: ")?;
            writeln!(stdout, "all")?;
        }
        Some(NamespaceScope::Only(namespaces)) => {
            label(stdout, "namespaces: ")?;
            writeln!(stdout, "{namespaces:?}")?;
        }
        None => {}
    }

    for diagnostic in ctx.diagnostics() {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
        write!(stdout, "warning: ")?;
        stdout.reset()?;
        writeln!(stdout, "{diagnostic}")?;
    }

    for field in ctx.highlight_fields() {
        label(stdout, "highlight: ")?;
        writeln!(stdout, "{} -> {} ({:?}, priority {})", field.field, field.target, field.kind, field.priority)?;
    }

    for component in ctx.rescore_components() {
        label(stdout, "rescore: ")?;
        writeln!(stdout, "{component:?}")?;
    }

    Ok(())
}

/// Print the whole compiled query as JSON, with each site's backend filter
pub fn print_compiled_json(compiled: &CompiledQuery) -> io::Result<()> {
    let mut value = serde_json::to_value(compiled).map_err(io::Error::other)?;
    value["host"]["backend_filter"] = compiled.host.backend_filter();
    if let Some(sites) = value["sister_sites"].as_array_mut() {
        for (json, site) in sites.iter_mut().zip(&compiled.sister_sites) {
            json["backend_filter"] = site.backend_filter();
        }
    }
    let text = serde_json::to_string_pretty(&value).map_err(io::Error::other)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{text}")
}

fn grammar_flags(grammar: &KeywordGrammar) -> String {
    let mut flags = Vec::new();
    match grammar.value {
        ValueMode::Required => {}
        ValueMode::AllowEmpty => flags.push("empty-ok".to_string()),
        ValueMode::Greedy => flags.push("greedy".to_string()),
    }
    if grammar.head_only {
        flags.push("head-only".to_string());
    }
    let delimiters: String = grammar
        .delimiters
        .iter()
        .map(|d| {
            let suffixes: String = d.suffixes.iter().collect();
            format!("{}{}", d.delimiter, suffixes)
        })
        .collect::<Vec<_>>()
        .join(" ");
    flags.push(format!("delimiters: {delimiters}"));
    flags.join(", ")
}

/// Print registered features in registration order
pub fn print_features<'a, I>(features: I, color: bool) -> io::Result<()>
where
    I: IntoIterator<Item = (&'static str, &'a KeywordGrammar)>,
{
    let mut stdout = StandardStream::stdout(color_choice(color));
    for (position, (name, grammar)) in features.into_iter().enumerate() {
        write!(stdout, "{:>2}. ", position + 1)?;
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
        write!(stdout, "{name}")?;
        stdout.reset()?;
        writeln!(stdout, "  [{}]  ({})", grammar.keywords.join(", "), grammar_flags(grammar))?;
    }
    Ok(())
}
