use std::collections::BTreeMap;
use std::str::FromStr;

/// A `NAME=VALUE` environment assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl FromStr for EnvVar {
    type Err = String;

    /// Split at the first `=`; the value may itself contain `=`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
        let name = name.trim();
        if !is_valid_name(name) {
            return Err(format!("invalid environment variable name '{name}'"));
        }
        Ok(EnvVar::new(name, value))
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// One step of a build definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildInstruction {
    From(String),
    Label(BTreeMap<String, String>),
    SetUser(u32),
    /// Paths are relative to the build context on the source side.
    Copy { src: String, dst: String },
    Run(String),
    Env { name: String, value: String },
    /// Like `Copy`, but a local tar archive is unpacked at `dst`.
    AddArchive { src: String, dst: String },
    Cmd(String),
}

/// An ordered instruction sequence. Order matters: later `Env`/`SetUser`
/// values apply to everything after them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildDefinition {
    instructions: Vec<BuildInstruction>,
}

impl BuildDefinition {
    pub(crate) fn new(instructions: Vec<BuildInstruction>) -> Self {
        Self { instructions }
    }

    pub fn instructions(&self) -> &[BuildInstruction] {
        &self.instructions
    }

    /// The command of the first `Run` whose text satisfies `pred`.
    pub fn find_run(&self, pred: impl Fn(&str) -> bool) -> Option<&str> {
        self.instructions.iter().find_map(|i| match i {
            BuildInstruction::Run(cmd) if pred(cmd) => Some(cmd.as_str()),
            _ => None,
        })
    }

    /// The final `Cmd`, if the definition ends with one.
    pub fn cmd(&self) -> Option<&str> {
        match self.instructions.last() {
            Some(BuildInstruction::Cmd(cmd)) => Some(cmd.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_var_splits_at_first_equals() {
        let var: EnvVar = "OPTS=-Da=b".parse().unwrap();
        assert_eq!(var, EnvVar::new("OPTS", "-Da=b"));
    }

    #[test]
    fn env_var_allows_empty_value() {
        let var: EnvVar = "EMPTY=".parse().unwrap();
        assert_eq!(var.value, "");
    }

    #[test]
    fn env_var_rejects_missing_equals_and_bad_names() {
        assert!("NOVALUE".parse::<EnvVar>().is_err());
        assert!("=x".parse::<EnvVar>().is_err());
        assert!("1ABC=x".parse::<EnvVar>().is_err());
        assert!("A B=x".parse::<EnvVar>().is_err());
        assert!("_ok9=x".parse::<EnvVar>().is_ok());
    }

    #[test]
    fn cmd_only_reports_trailing_cmd() {
        let def = BuildDefinition::new(vec![
            BuildInstruction::From("builder".into()),
            BuildInstruction::Cmd("/run".into()),
        ]);
        assert_eq!(def.cmd(), Some("/run"));

        let def = BuildDefinition::new(vec![
            BuildInstruction::Cmd("/run".into()),
            BuildInstruction::SetUser(0),
        ]);
        assert_eq!(def.cmd(), None);
    }
}
