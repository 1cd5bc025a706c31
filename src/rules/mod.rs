//! Built-in rules

mod math_round_int_long;

pub use math_round_int_long::{classify, ArgumentFamily, MathRoundIntLong};

use crate::config::Config;
use crate::rule::Rule;
use std::sync::Arc;

/// All built-in rules, configured from `config`
pub fn builtin_rules(config: &Config) -> Vec<Arc<dyn Rule>> {
    vec![Arc::new(MathRoundIntLong::from_config(&config.fix))]
}

/// Look up a built-in rule by ID, whether or not `config` enables it
pub fn find_rule(config: &Config, id: &str) -> Option<Arc<dyn Rule>> {
    builtin_rules(config).into_iter().find(|rule| rule.id() == id)
}
