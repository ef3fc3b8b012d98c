use crate::*;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1, take_while_m_n},
    character::complete::{char, digit1, multispace0},
    character::is_alphanumeric,
    combinator::{all_consuming, map, map_res},
    error::{convert_error, VerboseError},
    multi::{many0, separated_list0},
    number::complete::float,
    sequence::{delimited, preceded, separated_pair, terminated, tuple},
    Err, IResult,
};
use std::collections::BTreeMap;

type ParseResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

/// Tries to parse an entire theme.
pub fn try_parse_theme(theme: &str) -> Result<Vec<Rule>> {
    match all_consuming(rules)(theme) {
        Ok((_, rules)) => Ok(rules),
        Err(Err::Error(e)) | Err(Err::Failure(e)) => Err(Error::Theme(convert_error(theme, e))),
        Err(Err::Incomplete(_)) => Err(Error::Theme("Unexpected EOF loading the theme.".into())),
    }
}

/// A single theme rule including its selector.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// The selector that the rule is intended for.
    pub selector: Selector,
    /// The key/value pairs the rule holds.
    pub kvs: BTreeMap<String, PropertyValue>,
}

/// A parsed property value plus the unit its numbers were written in, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyValue {
    pub attr: Attr,
    pub unit: Option<MetricUnit>,
}

/// A single rule selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Selector {
    /// The technique kind a selector declares.
    /// E.g. `"solid-line"`.
    pub typ: Option<String>,
    /// E.g. `"0"`.
    pub id: Option<String>,
    /// E.g. `["road", "primary"]`.
    pub classes: Vec<String>,
    /// E.g. `layer=roads`.
    pub any: BTreeMap<String, String>,
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut selector = self.typ.clone().unwrap_or_default();
        if let Some(id) = &self.id {
            selector += "#";
            selector += id;
        }
        for class in &self.classes {
            selector += ".";
            selector += class;
        }
        for (k, v) in &self.any {
            selector += "[";
            selector += k;
            selector += "=";
            selector += v;
            selector += "]";
        }
        write!(f, "{}", selector)
    }
}

/// A single part of a selector.
/// Used for parsing only.
#[derive(Debug)]
enum SelectorPart {
    Class(String),
    Id(String),
    Any(String, String),
}

fn is_name_char(c: char) -> bool {
    is_alphanumeric(c as u8) || c == '-' || c == '_'
}

/// Munch all whitespace before and after `f`.
fn whitespace<'a, O, F>(f: F) -> impl FnMut(&'a str) -> ParseResult<'a, O>
where
    F: FnMut(&'a str) -> ParseResult<'a, O>,
{
    delimited(multispace0, f, multispace0)
}

/// Parses an entire set of rules.
fn rules(input: &str) -> ParseResult<Vec<Rule>> {
    terminated(many0(rule), multispace0)(input)
}

/// Parse a single rule.
/// E.g. `fill[layer=water] { color: #0000ff; }`.
fn rule(input: &str) -> ParseResult<Rule> {
    let (remaining, (selector, _, kvs, _)) = tuple((
        whitespace(selector),
        char('{'),
        body,
        whitespace(char('}')),
    ))(input)?;

    Ok((remaining, Rule { selector, kvs }))
}

/// Parse a single selector.
/// E.g. `solid-line.road#main[layer=roads]`.
fn selector(input: &str) -> ParseResult<Selector> {
    let mut selector = Selector::default();

    // The technique kind is required.
    let (remaining, typ) = take_while1(is_name_char)(input)?;
    selector.typ = Some(typ.into());

    let (remaining, parts) = many0(alt((class, id, any)))(remaining)?;
    for part in parts {
        match part {
            SelectorPart::Class(v) => selector.classes.push(v),
            SelectorPart::Id(v) => selector.id = Some(v),
            SelectorPart::Any(k, v) => {
                selector.any.insert(k, v);
            }
        }
    }

    Ok((remaining, selector))
}

/// E.g. `.road`.
fn class(input: &str) -> ParseResult<SelectorPart> {
    map(preceded(char('.'), take_while1(is_name_char)), |v: &str| {
        SelectorPart::Class(v.into())
    })(input)
}

/// E.g. `#main`.
fn id(input: &str) -> ParseResult<SelectorPart> {
    map(preceded(char('#'), take_while1(is_name_char)), |v: &str| {
        SelectorPart::Id(v.into())
    })(input)
}

/// E.g. `[layer=roads]`.
fn any(input: &str) -> ParseResult<SelectorPart> {
    map(
        delimited(
            char('['),
            separated_pair(take_while1(is_name_char), char('='), take_while1(is_name_char)),
            char(']'),
        ),
        |(k, v): (&str, &str)| SelectorPart::Any(k.into(), v.into()),
    )(input)
}

/// Parses the body of a rule.
fn body(input: &str) -> ParseResult<BTreeMap<String, PropertyValue>> {
    map(many0(kv), |kvs: Vec<(&str, PropertyValue)>| {
        kvs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    })(input)
}

/// Parses a single k/v pair.
/// E.g. `line-width: 10px;`.
fn kv(input: &str) -> ParseResult<(&str, PropertyValue)> {
    terminated(
        separated_pair(whitespace(take_while1(is_name_char)), char(':'), whitespace(property_value)),
        char(';'),
    )(input)
}

fn property_value(input: &str) -> ParseResult<PropertyValue> {
    alt((
        map(expression, |(expr, unit): (Expr, Option<MetricUnit>)| PropertyValue {
            attr: Attr::Expression(expr),
            unit,
        }),
        map(literal, |(value, unit): (Value, Option<MetricUnit>)| PropertyValue {
            attr: Attr::Constant(value),
            unit,
        }),
        map(string, |value| PropertyValue {
            attr: Attr::Constant(value),
            unit: None,
        }),
    ))(input)
}

/// Parses one of the expression forms.
/// The unit of the expression is the unit of its first numeric stop.
fn expression(input: &str) -> ParseResult<(Expr, Option<MetricUnit>)> {
    alt((var, interpolate, step))(input)
}

/// E.g. `var(zoom)`.
fn var(input: &str) -> ParseResult<(Expr, Option<MetricUnit>)> {
    map(
        delimited(tag("var("), whitespace(take_while1(is_name_char)), char(')')),
        |name: &str| (Expr::Var(name.into()), None),
    )(input)
}

/// E.g. `interpolate(zoom, 10: 1px, 14: 4px)`.
fn interpolate(input: &str) -> ParseResult<(Expr, Option<MetricUnit>)> {
    let (remaining, (_, input_name, _, stops, _)) = tuple((
        tag("interpolate("),
        whitespace(take_while1(is_name_char)),
        char(','),
        separated_list0(char(','), whitespace(stop)),
        char(')'),
    ))(input)?;

    let unit = stops_unit(&stops);
    let stops = stops.into_iter().map(|(x, value, _)| (x, value)).collect();
    Ok((
        remaining,
        (
            Expr::Interpolate {
                input: input_name.into(),
                stops,
            },
            unit,
        ),
    ))
}

/// E.g. `step(zoom, #ff0000, 12: #00ff00)`.
fn step(input: &str) -> ParseResult<(Expr, Option<MetricUnit>)> {
    let (remaining, (_, input_name, _, (default, default_unit), stops, _)) = tuple((
        tag("step("),
        whitespace(take_while1(is_name_char)),
        char(','),
        whitespace(literal),
        many0(preceded(char(','), whitespace(stop))),
        char(')'),
    ))(input)?;

    let unit = default_unit.or_else(|| stops_unit(&stops));
    let stops = stops.into_iter().map(|(x, value, _)| (x, value)).collect();
    Ok((
        remaining,
        (
            Expr::Step {
                input: input_name.into(),
                default: Box::new(default),
                stops,
            },
            unit,
        ),
    ))
}

fn stops_unit(stops: &[(f32, Value, Option<MetricUnit>)]) -> Option<MetricUnit> {
    stops.iter().find_map(|(_, _, unit)| *unit)
}

/// E.g. `10: 1px`.
fn stop(input: &str) -> ParseResult<(f32, Value, Option<MetricUnit>)> {
    map(
        separated_pair(float, whitespace(char(':')), literal),
        |(x, (value, unit)): (f32, (Value, Option<MetricUnit>))| (x, value, unit),
    )(input)
}

/// Parses any value that is not a bare string.
fn literal(input: &str) -> ParseResult<(Value, Option<MetricUnit>)> {
    alt((
        map(hex_color, |c| (Value::Color(c), None)),
        map(rgba_color, |c| (Value::Color(c), None)),
        map(rgb_color, |c| (Value::Color(c), None)),
        map(terminated(float, tag("px")), |v| (Value::Number(v), Some(MetricUnit::Pixel))),
        map(terminated(float, tag("w")), |v| (Value::Number(v), Some(MetricUnit::World))),
        map(float, |v| (Value::Number(v), None)),
        map(boolean, |b| (Value::Bool(b), None)),
    ))(input)
}

fn boolean(input: &str) -> ParseResult<bool> {
    let (remaining, value) = alt((tag("true"), tag("false")))(input)?;
    Ok((remaining, value == "true"))
}

/// Parses a single qualified string.
/// Can contain alphanumeric characters, '-', '_' and spaces.
fn string(input: &str) -> ParseResult<Value> {
    map(
        take_while(|c| is_name_char(c) || c == ' '),
        |value: &str| Value::String(value.trim().into()),
    )(input)
}

/// Converts a hex string into an `u8`.
fn from_hex(input: &str) -> std::result::Result<u8, std::num::ParseIntError> {
    u8::from_str_radix(input, 16)
}

/// Parse an actual hex code.
fn hex_primary(input: &str) -> ParseResult<u8> {
    map_res(take_while_m_n(2, 2, |c: char| c.is_digit(16)), from_hex)(input)
}

/// Parse a single hex color code including the `#`.
fn hex_color(input: &str) -> ParseResult<Color> {
    let (input, _) = tag("#")(input)?;
    let (input, (r, g, b)) = tuple((hex_primary, hex_primary, hex_primary))(input)?;

    Ok((input, Color { r, g, b, a: 1.0 }))
}

fn u8(input: &str) -> ParseResult<u8> {
    map_res(digit1, |digits: &str| digits.parse::<u8>())(input)
}

/// Parse an `rgba(r, g, b, a)` color.
fn rgba_color(input: &str) -> ParseResult<Color> {
    let (input, (_, r, _, g, _, b, _, a, _)) = tuple((
        tag("rgba("),
        whitespace(u8),
        char(','),
        whitespace(u8),
        char(','),
        whitespace(u8),
        char(','),
        whitespace(float),
        char(')'),
    ))(input)?;
    Ok((input, Color { r, g, b, a }))
}

/// Parse an `rgb(r, g, b)` color.
fn rgb_color(input: &str) -> ParseResult<Color> {
    let (input, (_, r, _, g, _, b, _)) = tuple((
        tag("rgb("),
        whitespace(u8),
        char(','),
        whitespace(u8),
        char(','),
        whitespace(u8),
        char(')'),
    ))(input)?;
    Ok((input, Color { r, g, b, a: 1.0 }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_selector_parts() {
        let rules = try_parse_theme("fill.park#big[layer=landuse] { color: #00ff00; }")
            .expect("valid theme");
        let selector = &rules[0].selector;
        assert_eq!(selector.typ.as_deref(), Some("fill"));
        assert_eq!(selector.id.as_deref(), Some("big"));
        assert_eq!(selector.classes, vec!["park".to_string()]);
        assert_eq!(selector.any.get("layer").map(|s| &s[..]), Some("landuse"));
        assert_eq!(selector.to_string(), "fill#big.park[layer=landuse]");
    }

    #[test]
    fn parses_values() {
        let rules = try_parse_theme(
            "
            solid-line {
                color: rgba(10, 20, 30, 0.5);
                line-width: 2.5px;
                outline-width: 1w;
                render-order: -3;
                clipping: false;
                metric-unit: px;
            }
            ",
        )
        .expect("valid theme");
        let kvs = &rules[0].kvs;
        assert_eq!(kvs["color"].attr, Attr::color(Color::rgba(10, 20, 30, 0.5)));
        assert_eq!(kvs["line-width"].attr, Attr::number(2.5));
        assert_eq!(kvs["line-width"].unit, Some(MetricUnit::Pixel));
        assert_eq!(kvs["outline-width"].unit, Some(MetricUnit::World));
        assert_eq!(kvs["render-order"].attr, Attr::number(-3.0));
        assert_eq!(kvs["clipping"].attr, Attr::boolean(false));
        assert_eq!(kvs["metric-unit"].attr, Attr::Constant(Value::String("px".into())));
    }

    #[test]
    fn parses_expressions() {
        let rules = try_parse_theme(
            "solid-line {
                line-width: interpolate(zoom, 10: 1px, 14: 4px);
                color: step(zoom, #ff0000, 12: #00ff00);
                opacity: var(fade);
            }",
        )
        .expect("valid theme");
        let kvs = &rules[0].kvs;
        assert_eq!(
            kvs["line-width"].attr,
            Attr::Expression(Expr::Interpolate {
                input: "zoom".into(),
                stops: vec![(10.0, Value::Number(1.0)), (14.0, Value::Number(4.0))],
            })
        );
        assert_eq!(kvs["line-width"].unit, Some(MetricUnit::Pixel));
        assert_eq!(
            kvs["color"].attr,
            Attr::Expression(Expr::Step {
                input: "zoom".into(),
                default: Box::new(Value::Color(Color::RED)),
                stops: vec![(12.0, Value::Color(Color::GREEN))],
            })
        );
        assert_eq!(kvs["opacity"].attr, Attr::Expression(Expr::Var("fade".into())));
    }

    #[test]
    fn parses_multiple_rules() {
        let rules = try_parse_theme(
            "fill { color: #0000ff; }\nterrain { color: #aabbcc; }\n",
        )
        .expect("valid theme");
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].selector.typ.as_deref(), Some("terrain"));
    }

    #[test]
    fn rejects_broken_themes() {
        assert!(matches!(
            try_parse_theme("fill { color: #0000ff; "),
            Err(Error::Theme(_))
        ));
    }
}
