//! TemplateEngine (spec §4.2): expands a provider template into a shell
//! command line using a context derived from saidata + provider + caller
//! variables. Variable interpolation is treated as data, never as code
//! (spec §9 Design Notes): resolution is strict-name, followed by a
//! shell-quoting pass for anything that isn't already a safe bare word.

use std::collections::HashMap;

use regex::Regex;
use sai_core::{ErrorKind, Result, SaiError, Saidata};

/// Everything the engine needs to resolve a single template.
pub struct Context<'a> {
    pub saidata: &'a Saidata,
    pub provider_name: &'a str,
    pub variables: &'a HashMap<String, String>,
    pub software: &'a str,
    /// Toggleable per spec §4.2: when true, undefined names, raw
    /// newlines, and unsafe caller variables are rejected rather than
    /// silently tolerated.
    pub safety_mode: bool,
}

fn placeholder_re() -> Regex {
    Regex::new(r"\{\{\s*([^}]+?)\s*\}\}").unwrap()
}

/// A resolved value is considered a "safe bare word" if it needs no shell
/// quoting at all — this keeps rendered commands readable
/// (`apt-get install -y nginx`, not `apt-get install -y 'nginx'`) while
/// still guaranteeing nothing unsafe reaches the shell unquoted.
fn is_safe_bareword(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_.:/=@%+-".contains(c))
}

/// Single-quote wrap with embedded-quote escaping — the shell-quoting pass
/// named in spec §9 Design Notes.
fn shell_quote(value: &str) -> String {
    shlex::try_quote(value)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| format!("'{}'", value.replace('\'', "'\\''")))
}

fn resolve_sai_package(ctx: &Context) -> Option<String> {
    ctx.saidata
        .provider_package_name(ctx.provider_name)
        .or_else(|| ctx.saidata.default_package_name())
        .map(str::to_string)
        .or_else(|| Some(ctx.software.to_string()))
}

fn resolve_sai_service(ctx: &Context) -> Option<String> {
    ctx.saidata
        .provider_service_name(ctx.provider_name)
        .or_else(|| ctx.saidata.top_level_service_name())
        .map(str::to_string)
        .or_else(|| Some(ctx.software.to_string()))
}

fn resolve_sai_port(ctx: &Context) -> Option<String> {
    ctx.saidata
        .resources
        .ports
        .first()
        .map(|p| p.port.to_string())
}

fn resolve_sai_port_named(ctx: &Context, logical_name: &str) -> Option<String> {
    ctx.saidata
        .resources
        .ports
        .iter()
        .find(|p| p.name == logical_name)
        .map(|p| p.port.to_string())
}

fn resolve_sai_file(ctx: &Context, logical_name: &str) -> Option<String> {
    ctx.saidata.file_by_name(logical_name).map(|f| f.path.clone())
}

fn parse_quoted_arg(rest: &str) -> Option<String> {
    let rest = rest.trim();
    let rest = rest.strip_prefix('"').or_else(|| rest.strip_prefix('\''))?;
    let rest = rest.strip_suffix('"').or_else(|| rest.strip_suffix('\''))?;
    Some(rest.to_string())
}

enum Resolved {
    /// Already safe to place verbatim (e.g. software-id, package name).
    Bare(String),
    /// Caller-supplied; subject to the unsafe-metacharacter rejection rule.
    Variable(String),
}

fn resolve_expression(expr: &str, ctx: &Context) -> Result<Option<Resolved>> {
    let expr = expr.trim();
    if expr == "sai_package" {
        return Ok(resolve_sai_package(ctx).map(Resolved::Bare));
    }
    if expr == "sai_service" {
        return Ok(resolve_sai_service(ctx).map(Resolved::Bare));
    }
    if expr == "sai_port" {
        return Ok(resolve_sai_port(ctx).map(Resolved::Bare));
    }
    if let Some(rest) = expr.strip_prefix("sai_file") {
        let name = parse_quoted_arg(rest).ok_or_else(|| {
            SaiError::new(
                ErrorKind::TemplateResolution,
                format!("malformed sai_file expression: {{{{{expr}}}}}"),
            )
        })?;
        return Ok(resolve_sai_file(ctx, &name).map(Resolved::Bare));
    }
    if let Some(rest) = expr.strip_prefix("sai_port") {
        let name = parse_quoted_arg(rest).ok_or_else(|| {
            SaiError::new(
                ErrorKind::TemplateResolution,
                format!("malformed sai_port expression: {{{{{expr}}}}}"),
            )
        })?;
        return Ok(resolve_sai_port_named(ctx, &name).map(Resolved::Bare));
    }
    if let Some(name) = expr.strip_prefix("var.") {
        return Ok(ctx.variables.get(name).cloned().map(Resolved::Variable));
    }
    if expr == ".Software" {
        return Ok(Some(Resolved::Bare(ctx.software.to_string())));
    }
    Ok(None)
}

const SHELL_METACHARS: &[char] = &[
    ';', '&', '|', '`', '$', '(', ')', '<', '>', '\n', '\r', '"', '\'', '\\', '*', '?', '~', '{', '}',
];

fn has_shell_metachars(value: &str) -> bool {
    value.chars().any(|c| SHELL_METACHARS.contains(&c))
}

/// Expand a single template string into one shell command line.
pub fn render(template: &str, ctx: &Context) -> Result<String> {
    if ctx.safety_mode && template.contains('\n') {
        return Err(SaiError::new(
            ErrorKind::TemplateResolution,
            "template contains a raw newline",
        ));
    }

    let re = placeholder_re();
    let mut err: Option<SaiError> = None;
    let rendered = re.replace_all(template, |caps: &regex::Captures| {
        if err.is_some() {
            return String::new();
        }
        let expr = &caps[1];
        match resolve_expression(expr, ctx) {
            Ok(Some(Resolved::Bare(value))) => {
                if is_safe_bareword(&value) {
                    value
                } else {
                    shell_quote(&value)
                }
            }
            Ok(Some(Resolved::Variable(value))) => {
                if ctx.safety_mode && has_shell_metachars(&value) {
                    err = Some(SaiError::new(
                        ErrorKind::TemplateResolution,
                        format!("variable '{expr}' contains unsafe shell metacharacters"),
                    ));
                    String::new()
                } else if is_safe_bareword(&value) {
                    value
                } else {
                    shell_quote(&value)
                }
            }
            Ok(None) => {
                if ctx.safety_mode {
                    err = Some(
                        SaiError::new(
                            ErrorKind::TemplateResolution,
                            format!("undefined template reference '{{{{{expr}}}}}'"),
                        )
                        .with_suggestion(format!(
                            "declare '{expr}' in saidata or pass it as a --var"
                        )),
                    );
                }
                String::new()
            }
            Err(e) => {
                err = Some(e);
                String::new()
            }
        }
    });

    if let Some(e) = err {
        return Err(e);
    }
    Ok(rendered.into_owned())
}

/// Expand an ordered list of step commands.
pub fn render_steps(templates: &[&str], ctx: &Context) -> Result<Vec<String>> {
    templates.iter().map(|t| render(t, ctx)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sai_core::{PackageResource, ProviderOverride, ResourceCollections};
    use std::collections::HashMap;

    fn saidata_with_package(name: &str) -> Saidata {
        Saidata {
            resources: ResourceCollections {
                packages: vec![PackageResource {
                    name: name.to_string(),
                    version: String::new(),
                }],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn resolves_sai_package_from_top_level() {
        let saidata = saidata_with_package("nginx");
        let vars = HashMap::new();
        let ctx = Context {
            saidata: &saidata,
            provider_name: "apt",
            variables: &vars,
            software: "nginx",
            safety_mode: true,
        };
        let out = render("apt-get install -y {{sai_package}}", &ctx).unwrap();
        assert_eq!(out, "apt-get install -y nginx");
    }

    #[test]
    fn provider_override_package_wins_over_top_level() {
        let mut saidata = saidata_with_package("apache2");
        saidata.providers.insert(
            "dnf".to_string(),
            ProviderOverride {
                resources: ResourceCollections {
                    packages: vec![PackageResource {
                        name: "httpd".to_string(),
                        version: String::new(),
                    }],
                    ..Default::default()
                },
                ..Default::default()
            },
        );
        let vars = HashMap::new();
        let ctx = Context {
            saidata: &saidata,
            provider_name: "dnf",
            variables: &vars,
            software: "apache2",
            safety_mode: true,
        };
        let out = render("yum install -y {{sai_package}}", &ctx).unwrap();
        assert_eq!(out, "yum install -y httpd");
    }

    #[test]
    fn falls_back_to_software_id_when_no_package_declared() {
        let saidata = Saidata::default();
        let vars = HashMap::new();
        let ctx = Context {
            saidata: &saidata,
            provider_name: "apt",
            variables: &vars,
            software: "flibber",
            safety_mode: true,
        };
        let out = render("apt-get install -y {{sai_package}}", &ctx).unwrap();
        assert_eq!(out, "apt-get install -y flibber");
    }

    #[test]
    fn safety_mode_rejects_undefined_variable() {
        let saidata = Saidata::default();
        let vars = HashMap::new();
        let ctx = Context {
            saidata: &saidata,
            provider_name: "apt",
            variables: &vars,
            software: "nginx",
            safety_mode: true,
        };
        let err = render("echo {{var.missing}}", &ctx).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TemplateResolution);
    }

    #[test]
    fn safety_mode_rejects_raw_newline() {
        let saidata = Saidata::default();
        let vars = HashMap::new();
        let ctx = Context {
            saidata: &saidata,
            provider_name: "apt",
            variables: &vars,
            software: "nginx",
            safety_mode: true,
        };
        let err = render("echo one\necho two", &ctx).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TemplateResolution);
    }

    #[test]
    fn safety_mode_rejects_unsafe_variable_metacharacters() {
        let saidata = Saidata::default();
        let mut vars = HashMap::new();
        vars.insert("payload".to_string(), "foo; rm -rf /".to_string());
        let ctx = Context {
            saidata: &saidata,
            provider_name: "apt",
            variables: &vars,
            software: "nginx",
            safety_mode: true,
        };
        let err = render("echo {{var.payload}}", &ctx).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TemplateResolution);
    }

    #[test]
    fn software_id_expression_resolves() {
        let saidata = Saidata::default();
        let vars = HashMap::new();
        let ctx = Context {
            saidata: &saidata,
            provider_name: "apt",
            variables: &vars,
            software: "nginx",
            safety_mode: true,
        };
        let out = render("systemctl status {{.Software}}", &ctx).unwrap();
        assert_eq!(out, "systemctl status nginx");
    }
}
