//! Flag parsing shared by the subcommands.

use crate::CommandOutput;

/// Parsed subcommand arguments.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct CommandArgs {
    pub positionals: Vec<String>,
    pub text: Option<String>,
    pub icon: Option<String>,
    pub user: Option<String>,
    pub prefix: Option<String>,
    pub json: bool,
    pub help: bool,
}

const VALUE_FLAGS: &[&str] = &["--text", "--icon", "--user", "--prefix"];

/// Parse `args`, accepting only the flags listed in `allowed` (plus help).
///
/// Value flags take `--flag VALUE` or `--flag=VALUE`.
pub(crate) fn parse(args: &[&str], allowed: &[&str]) -> Result<CommandArgs, CommandOutput> {
    let mut parsed = CommandArgs::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match *arg {
            "-h" | "--help" => parsed.help = true,
            "" => {}
            v if v.starts_with("--") => {
                let (name, inline) = match v.split_once('=') {
                    Some((name, value)) => (name, Some(value.to_string())),
                    None => (v, None),
                };
                if !allowed.contains(&name) {
                    return Err(CommandOutput::usage(format!("unknown flag: {name}")));
                }
                if name == "--json" {
                    if inline.is_some() {
                        return Err(CommandOutput::usage(format!(
                            "flag {name} does not take a value"
                        )));
                    }
                    parsed.json = true;
                    continue;
                }
                if !VALUE_FLAGS.contains(&name) {
                    return Err(CommandOutput::usage(format!("unknown flag: {name}")));
                }
                let value = match inline {
                    Some(value) => value,
                    None => match iter.next() {
                        Some(value) => value.to_string(),
                        None => {
                            return Err(CommandOutput::usage(format!(
                                "flag needs an argument: {name}"
                            )))
                        }
                    },
                };
                let slot = match name {
                    "--text" => &mut parsed.text,
                    "--icon" => &mut parsed.icon,
                    "--user" => &mut parsed.user,
                    _ => &mut parsed.prefix,
                };
                *slot = Some(value);
            }
            v if v.starts_with('-') && v.len() > 1 => {
                return Err(CommandOutput::usage(format!("unknown shorthand flag: {v}")));
            }
            v => parsed.positionals.push(v.to_string()),
        }
    }
    Ok(parsed)
}

/// Require exactly `names.len()` positionals.
pub(crate) fn expect_positionals<'a>(
    parsed: &'a CommandArgs,
    names: &[&str],
) -> Result<&'a [String], CommandOutput> {
    if parsed.positionals.len() != names.len() {
        let wanted = names
            .iter()
            .map(|name| format!("<{name}>"))
            .collect::<Vec<_>>()
            .join(" ");
        return Err(CommandOutput::usage(format!(
            "expected {wanted}, got {} args",
            parsed.positionals.len()
        )));
    }
    Ok(&parsed.positionals)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn value_flags_accept_both_forms() {
        let parsed = parse(
            &["p", "--text", "hello world", "--icon=info"],
            &["--text", "--icon"],
        )
        .unwrap();
        assert_eq!(parsed.positionals, vec!["p".to_string()]);
        assert_eq!(parsed.text.as_deref(), Some("hello world"));
        assert_eq!(parsed.icon.as_deref(), Some("info"));
        assert!(!parsed.json);
    }

    #[test]
    fn unknown_flags_are_usage_errors() {
        let err = parse(&["--bogus"], &["--json"]).unwrap_err();
        assert_eq!(err.exit_code, 2);
        assert!(err.stderr.contains("unknown flag: --bogus"));

        let err = parse(&["-x"], &["--json"]).unwrap_err();
        assert_eq!(err.exit_code, 2);
    }

    #[test]
    fn missing_value_is_a_usage_error() {
        let err = parse(&["--text"], &["--text"]).unwrap_err();
        assert!(err.stderr.contains("flag needs an argument: --text"));
    }

    #[test]
    fn bare_help_word_is_positional() {
        let parsed = parse(&["help", "--text", "x"], &["--text"]).unwrap();
        assert!(!parsed.help);
        assert_eq!(parsed.positionals, vec!["help".to_string()]);

        assert!(parse(&["help", "--help"], &[]).unwrap().help);
        assert!(parse(&["-h"], &[]).unwrap().help);
    }

    #[test]
    fn dash_alone_is_positional() {
        let parsed = parse(&["-"], &[]).unwrap();
        assert_eq!(parsed.positionals, vec!["-".to_string()]);
    }

    #[test]
    fn positional_count_is_checked() {
        let parsed = parse(&["a"], &[]).unwrap();
        let err = expect_positionals(&parsed, &["plugin", "index"]).unwrap_err();
        assert!(err.stderr.contains("expected <plugin> <index>, got 1 args"));
        assert!(expect_positionals(&parsed, &["plugin"]).is_ok());
    }
}
