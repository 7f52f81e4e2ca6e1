// Apache access log rule (common format)

use super::nginx::access_record;
use super::FormatRule;
use regex::Regex;

pub(crate) fn rule() -> FormatRule {
    // same shape as nginx combined, minus referer and user agent
    let pattern = Regex::new(r#"^(\S+) (\S+) (\S+) \[([\w:/]+\s[+\-]\d{4})\] "(.+?)" (\d{3}) (\d+|-)"#)
        .expect("apache access pattern is valid");

    FormatRule::new("Apache Access Log", pattern, |caps| access_record(caps, "apache"))
}
