// SPDX-FileCopyrightText: 2019 Camille019
// SPDX-License-Identifier: MPL-2.0

use std::fs;
use std::path::Path;

use lazy_static::lazy_static;

use pest::iterators::Pair;
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::Parser;
use pest_derive::Parser;

use crate::error::Error;

#[derive(Parser)]
#[grammar = "conf.pest"]
pub(crate) struct SensorsConfParser;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Operator {
    Add,
    Sub,
    Multiply,
    Divide,
}

impl Operator {
    fn eval(&self, left: f64, right: f64) -> f64 {
        match self {
            Operator::Add => left + right,
            Operator::Sub => left - right,
            Operator::Multiply => left * right,
            Operator::Divide => left / right,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Function {
    Inv,
    Exp,
    Ln,
}

impl Function {
    fn eval(&self, arg: f64) -> f64 {
        match self {
            Function::Inv => -arg,
            Function::Exp => arg.exp(),
            Function::Ln => arg.ln(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) enum Expr {
    Fn(Function, Box<Expr>),
    Op(Operator, Box<Expr>, Box<Expr>),
    Literal(f64),
    #[default]
    Raw,
}

impl Expr {
    /// Evaluate the expression, `@` standing for `raw`.
    pub(crate) fn eval(&self, raw: f64) -> f64 {
        match self {
            Expr::Fn(ref inner, ref expr) => inner.eval(expr.eval(raw)),
            Expr::Op(ref inner, ref left, ref right) => inner.eval(left.eval(raw), right.eval(raw)),
            Expr::Literal(inner) => *inner,
            Expr::Raw => raw,
        }
    }

    fn uses_raw(&self) -> bool {
        match self {
            Expr::Fn(_, ref expr) => expr.uses_raw(),
            Expr::Op(_, ref left, ref right) => left.uses_raw() || right.uses_raw(),
            Expr::Literal(_) => false,
            Expr::Raw => true,
        }
    }
}

/// Conversion between the value read from sysfs and the displayed one.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Compute {
    from_proc: Expr,
    to_proc: Expr,
}

impl Compute {
    pub(crate) fn from_proc(&self, raw: f64) -> f64 {
        self.from_proc.eval(raw)
    }

    pub(crate) fn to_proc(&self, value: f64) -> f64 {
        self.to_proc.eval(value)
    }
}

#[derive(Debug, Default, PartialEq)]
pub(crate) struct CfgFile {
    pub(crate) chips: Vec<StmtChip>,
}

#[derive(Debug, Default, PartialEq)]
pub(crate) struct StmtChip {
    pub(crate) names: Vec<String>,
    pub(crate) labels: Vec<StmtLabel>,
    pub(crate) sets: Vec<StmtSet>,
    pub(crate) computes: Vec<StmtCompute>,
    pub(crate) ignores: Vec<StmtIgnore>,
}

#[derive(Debug, Default, PartialEq)]
pub(crate) struct StmtLabel {
    pub(crate) name: String,
    pub(crate) value: String,
}

#[derive(Debug, Default, PartialEq)]
pub(crate) struct StmtIgnore {
    pub(crate) name: String,
}

#[derive(Debug, Default, PartialEq)]
pub(crate) struct StmtCompute {
    pub(crate) name: String,
    pub(crate) compute: Compute,
}

#[derive(Debug, Default, PartialEq)]
pub(crate) struct StmtSet {
    pub(crate) name: String,
    pub(crate) value: f64,
}

/// Resolve C-like escapes of a quoted string. Unknown escapes stand for
/// the escaped character itself.
fn unescape(text: &str) -> String {
    let mut res = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            res.push(c);
            continue;
        }
        match chars.next() {
            Some('a') => res.push('\x07'),
            Some('b') => res.push('\x08'),
            Some('f') => res.push('\x0C'),
            Some('n') => res.push('\n'),
            Some('r') => res.push('\r'),
            Some('t') => res.push('\t'),
            Some('v') => res.push('\x0B'),
            Some(other) => res.push(other),
            None => {}
        }
    }

    res
}

/// Text of a `name` or `string` pair, quotes and escapes resolved.
fn parse_ptext(pair: Pair<Rule>) -> String {
    debug_assert!(pair.as_rule() == Rule::name || pair.as_rule() == Rule::string);

    match pair.into_inner().next() {
        Some(inner) if inner.as_rule() == Rule::text => unescape(inner.as_str()),
        Some(inner) => inner.as_str().to_string(),
        None => String::new(),
    }
}

fn parse_pterm(pair: Pair<Rule>) -> Result<Expr, Error> {
    match pair.as_rule() {
        Rule::raw => Ok(Expr::Raw),
        Rule::num => Ok(Expr::Literal(pair.as_str().parse::<f64>()?)),
        Rule::function => parse_pfunction(pair),
        Rule::expr => parse_pexpr(pair),
        _ => unreachable!(),
    }
}

fn parse_pfunction(pfunc: Pair<Rule>) -> Result<Expr, Error> {
    debug_assert!(pfunc.as_rule() == Rule::function);

    let mut pfunc_inner = pfunc.into_inner();
    let (Some(pop), Some(poperand)) = (pfunc_inner.next(), pfunc_inner.next()) else {
        unreachable!()
    };

    let function = match pop.as_rule() {
        Rule::inv => Function::Inv,
        Rule::exp => Function::Exp,
        Rule::ln => Function::Ln,
        _ => unreachable!(),
    };

    Ok(Expr::Fn(function, Box::from(parse_pterm(poperand)?)))
}

lazy_static! {
    static ref PRATT_PARSER: PrattParser<Rule> = PrattParser::new()
        .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
        .op(Op::infix(Rule::mult, Assoc::Left) | Op::infix(Rule::div, Assoc::Left));
}

fn parse_pexpr(pexpr: Pair<Rule>) -> Result<Expr, Error> {
    debug_assert!(pexpr.as_rule() == Rule::expr);

    PRATT_PARSER
        .map_primary(parse_pterm)
        .map_infix(|lhs, op, rhs| {
            let operator = match op.as_rule() {
                Rule::add => Operator::Add,
                Rule::sub => Operator::Sub,
                Rule::mult => Operator::Multiply,
                Rule::div => Operator::Divide,
                _ => unreachable!(),
            };
            Ok(Expr::Op(operator, Box::from(lhs?), Box::from(rhs?)))
        })
        .parse(pexpr.into_inner())
}

fn parse_pcompute(pcompute: Pair<Rule>) -> Result<StmtCompute, Error> {
    debug_assert!(pcompute.as_rule() == Rule::compute);

    let mut pcompute_inner = pcompute.into_inner();
    let (Some(pname), Some(pfrom), Some(pto)) = (
        pcompute_inner.next(),
        pcompute_inner.next(),
        pcompute_inner.next(),
    ) else {
        unreachable!()
    };

    Ok(StmtCompute {
        name: parse_ptext(pname),
        compute: Compute {
            from_proc: parse_pexpr(pfrom)?,
            to_proc: parse_pexpr(pto)?,
        },
    })
}

fn parse_pignore(pignore: Pair<Rule>) -> StmtIgnore {
    debug_assert!(pignore.as_rule() == Rule::ignore);

    StmtIgnore {
        name: pignore
            .into_inner()
            .next()
            .map(parse_ptext)
            .unwrap_or_default(),
    }
}

fn parse_plabel(plabel: Pair<Rule>) -> StmtLabel {
    debug_assert!(plabel.as_rule() == Rule::label);

    let mut label = StmtLabel::default();

    for pair in plabel.into_inner() {
        match pair.as_rule() {
            Rule::name => label.name = parse_ptext(pair),
            Rule::string => label.value = parse_ptext(pair),
            _ => {
                log::debug!("Found bad pair: {:#?}", pair);
                unreachable!()
            }
        }
    }

    label
}

fn parse_pset(pset: Pair<Rule>) -> Result<StmtSet, Error> {
    debug_assert!(pset.as_rule() == Rule::set);

    let mut name = String::new();
    let mut value = Expr::default();

    for pair in pset.into_inner() {
        match pair.as_rule() {
            Rule::name => name = parse_ptext(pair),
            Rule::expr => value = parse_pexpr(pair)?,
            _ => {
                log::debug!("Found bad pair: {:#?}", pair);
                unreachable!()
            }
        }
    }

    // There is no raw value to stand for when writing
    if value.uses_raw() {
        return Err(Error::Config(format!("'@' used in set statement for {}", name)));
    }

    Ok(StmtSet {
        value: value.eval(0.0),
        name,
    })
}

fn parse_pchip(pchip: Pair<Rule>) -> Result<StmtChip, Error> {
    debug_assert!(pchip.as_rule() == Rule::chip);

    let mut chip = StmtChip::default();

    for pair in pchip.into_inner() {
        match pair.as_rule() {
            Rule::name => chip.names.push(parse_ptext(pair)),
            Rule::compute => chip.computes.push(parse_pcompute(pair)?),
            Rule::ignore => chip.ignores.push(parse_pignore(pair)),
            Rule::label => chip.labels.push(parse_plabel(pair)),
            Rule::set => chip.sets.push(parse_pset(pair)?),
            _ => {
                log::debug!("Found bad pair: {:#?}", pair);
                unreachable!()
            }
        }
    }

    Ok(chip)
}

fn parse_pfile(pfile: Pair<Rule>) -> Result<CfgFile, Error> {
    debug_assert!(pfile.as_rule() == Rule::file);

    let mut cfg = CfgFile::default();

    for pair in pfile.into_inner() {
        match pair.as_rule() {
            Rule::bus => log::debug!("Ignore bus statement: {}", pair.as_str().trim_end()),
            Rule::chip => cfg.chips.push(parse_pchip(pair)?),
            Rule::EOI => {}
            _ => {
                log::debug!("Found bad pair: {:#?}", pair);
                unreachable!()
            }
        }
    }

    Ok(cfg)
}

pub(crate) fn parse_configuration_str(data: &str) -> Result<CfgFile, Error> {
    let root = SensorsConfParser::parse(Rule::file, data)
        .map_err(|err| Error::Config(err.to_string()))?
        .next()
        .ok_or_else(|| Error::Config(String::from("empty parse tree")))?;

    parse_pfile(root)
}

pub(crate) fn parse_configuration_file<P: AsRef<Path>>(path: P) -> Result<CfgFile, Error> {
    let file = fs::read_to_string(path)?;

    parse_configuration_str(&file)
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    fn single_label(name: &str, value: &str) -> CfgFile {
        CfgFile {
            chips: vec![StmtChip {
                names: vec![String::from("blah-*")],
                labels: vec![StmtLabel {
                    name: String::from(name),
                    value: String::from(value),
                }],
                ..Default::default()
            }],
        }
    }

    #[test]
    fn parse_conf_name_unquoted() {
        let cfg_str = r#"
chip "blah-*"
    label foo bar
"#;
        let conf = parse_configuration_str(cfg_str).unwrap_or_default();
        assert_eq!(conf, single_label("foo", "bar"));
    }

    #[test]
    fn parse_conf_name_escaped_newline() {
        let cfg_str = r#"
chip "blah-*"
    label		\
     foo bar
"#;
        let conf = parse_configuration_str(cfg_str).unwrap_or_default();
        assert_eq!(conf, single_label("foo", "bar"));
    }

    #[test]
    fn parse_conf_name_immediate_EOF() {
        let cfg_str = r#"
chip "blah-*"
    label foo bar"#;
        let conf = parse_configuration_str(cfg_str).unwrap_or_default();
        assert_eq!(conf, single_label("foo", "bar"));
    }

    #[test]
    fn parse_conf_name_errors() {
        for bad in &["?foo", "foo%", "baz$foo", "!"] {
            let cfg_str = format!("\nchip \"blah-*\"\n    label {} \"bar\"\n", bad);
            assert!(parse_configuration_str(&cfg_str).is_err(), "{}", bad);
        }
    }

    #[test]
    fn parse_conf_name_quoted() {
        let cfg_str = r#"
chip "blah-*"
    label "foo" "bar"
"#;
        let conf = parse_configuration_str(cfg_str).unwrap_or_default();
        assert_eq!(conf, single_label("foo", "bar"));
    }

    #[test]
    fn parse_conf_name_quoted_full_range() {
        let cfg_str = r#"
chip "blah-*"
    label "abcdefg" "hijklmnop"
    label "qrs" "tuv"
    label "wx" "yz"
    label "a0123456789" "982lksdf"
    label "_abcd" "1234_"
    label "_" "foo_bar_baz"
    label "liajesiajef82197fjadf" "blah"
"#;
        let pairs = [
            ("abcdefg", "hijklmnop"),
            ("qrs", "tuv"),
            ("wx", "yz"),
            ("a0123456789", "982lksdf"),
            ("_abcd", "1234_"),
            ("_", "foo_bar_baz"),
            ("liajesiajef82197fjadf", "blah"),
        ];
        let expected = CfgFile {
            chips: vec![StmtChip {
                names: vec![String::from("blah-*")],
                labels: pairs
                    .iter()
                    .map(|(name, value)| StmtLabel {
                        name: String::from(*name),
                        value: String::from(*value),
                    })
                    .collect(),
                ..Default::default()
            }],
        };
        let conf = parse_configuration_str(cfg_str).unwrap_or_default();
        assert_eq!(conf, expected);
    }

    #[test]
    fn parse_conf_name_quoted_escaped_newline() {
        let cfg_str = r#"
chip "blah-*"
    label		\
     "foo" "bar"
"#;
        let conf = parse_configuration_str(cfg_str).unwrap_or_default();
        assert_eq!(conf, single_label("foo", "bar"));
    }

    #[test]
    fn parse_conf_name_quoted_escaped_chars_like_c() {
        let cfg_str = r#"
chip "blah-*"
    label escapes "\a\b\f\n\r\t\v\\\?\'\""
"#;
        let conf = parse_configuration_str(cfg_str).unwrap_or_default();
        assert_eq!(
            conf,
            single_label("escapes", "\x07\x08\x0C\n\r\t\x0B\\?\'\"")
        );
    }

    #[test]
    fn parse_conf_name_quoted_escaped_chars_collapse() {
        let cfg_str = r#"
chip "blah-*"
    label more "\h\e\l\l\o"
"#;
        let conf = parse_configuration_str(cfg_str).unwrap_or_default();
        assert_eq!(conf, single_label("more", "hello"));
    }

    #[test]
    fn parse_conf_name_quoted_immediate_EOF() {
        let cfg_str = r#"
chip "blah-*"
    label "foo" "bar""#;
        let conf = parse_configuration_str(cfg_str).unwrap_or_default();
        assert_eq!(conf, single_label("foo", "bar"));
    }

    #[test]
    fn parse_conf_name_quoted_error_no_whitespace() {
        let cfg_str = r#"
chip "blah-*"
    label "foo""bar"
"#;
        assert!(parse_configuration_str(cfg_str).is_err());
    }

    #[test]
    fn parse_conf_name_quoted_error_no_closing_EOL() {
        let cfg_str = r#"
chip "blah-*"
    label "in0" "foo
    label "in1" "bar"
"#;
        assert!(parse_configuration_str(cfg_str).is_err());
    }

    #[test]
    fn parse_conf_name_quoted_error_no_closing_EOF() {
        let cfg_str = r#"
chip "blah-*"
    label "foo" "bar"#;
        assert!(parse_configuration_str(cfg_str).is_err());
    }

    #[test]
    fn parse_conf_str_compute() {
        let cfg_str = r#"
chip "lm78-*"

    compute in1 @*(1+120/56) - 4.096*120/56, -(@ + 4.096*120/56)/(1+120/56)
    compute in2 @*(1+120/56) - 4.096*120/56, `(@ + 4.096*120/56)/(1+120/56)
    compute in3 @*(1+120/56) - 4.096*120/56, ^(@ + 4.096*120/56)/(1+120/56)
"#;
        let conf = parse_configuration_str(cfg_str).unwrap();
        let computes = &conf.chips[0].computes;
        assert_eq!(computes.len(), 3);
        assert_eq!(computes[0].name, "in1");

        let compute = &computes[0].compute;
        let expected = 2.0 * (1.0 + 120.0 / 56.0) - 4.096 * 120.0 / 56.0;
        assert!((compute.from_proc(2.0) - expected).abs() < 1e-9);
        let expected = -(2.0 + 4.096 * 120.0 / 56.0) / (1.0 + 120.0 / 56.0);
        assert!((compute.to_proc(2.0) - expected).abs() < 1e-9);
    }

    #[test]
    fn parse_conf_precedence() {
        let cfg_str = "chip \"lm78-*\"\n    compute in0 1 + 2 * @ - 6 / 3, @\n";
        let conf = parse_configuration_str(cfg_str).unwrap();
        assert_eq!(conf.chips[0].computes[0].compute.from_proc(4.0), 7.0);
    }

    #[test]
    fn parse_conf_full_file() {
        let cfg_str = r#"
# Comment at top
bus "i2c-0" "SMBus PIIX4 adapter at 0c00"

chip "lm78-*" "lm79-*"   # two chips

    set in0_min 1.8 * 0.95
    set temp1_max 60
    ignore fan3

chip "acpitz-virtual-*"
    label temp1 "Board"
"#;
        let conf = parse_configuration_str(cfg_str).unwrap();
        assert_eq!(conf.chips.len(), 2);

        let lm78 = &conf.chips[0];
        assert_eq!(lm78.names, vec!["lm78-*", "lm79-*"]);
        assert_eq!(lm78.sets.len(), 2);
        assert_eq!(lm78.sets[0].name, "in0_min");
        assert!((lm78.sets[0].value - 1.71).abs() < 1e-9);
        assert_eq!(lm78.sets[1].value, 60.0);
        assert_eq!(lm78.ignores[0].name, "fan3");

        assert_eq!(conf.chips[1].labels[0].value, "Board");
    }

    #[test]
    fn parse_conf_set_with_raw_value() {
        let cfg_str = "chip \"lm78-*\"\n    set in0_min @ * 2\n";
        assert!(matches!(
            parse_configuration_str(cfg_str),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn parse_conf_empty() {
        assert_eq!(parse_configuration_str("").unwrap(), CfgFile::default());
        assert_eq!(
            parse_configuration_str("\n  # nothing\n\n").unwrap(),
            CfgFile::default()
        );
    }
}
