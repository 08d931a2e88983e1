//! Dockerfile rendering of a [`BuildDefinition`].
//!
//! Strings that could carry quotes or spaces (label keys and values, `ENV`
//! values, the `CMD` path) are emitted as JSON strings, which the Dockerfile
//! parser accepts as double-quoted words.

use std::fmt;

use serde_json::Value;

use super::types::{BuildDefinition, BuildInstruction};

impl fmt::Display for BuildInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildInstruction::From(image) => write!(f, "FROM {image}"),
            BuildInstruction::Label(labels) => {
                f.write_str("LABEL")?;
                for (idx, (key, value)) in labels.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(" \\\n     ")?;
                    }
                    write!(f, " {}={}", quoted(key), quoted(value))?;
                }
                Ok(())
            }
            BuildInstruction::SetUser(uid) => write!(f, "USER {uid}"),
            BuildInstruction::Copy { src, dst } => write!(f, "COPY {src} {dst}"),
            BuildInstruction::Run(cmd) => write!(f, "RUN {cmd}"),
            BuildInstruction::Env { name, value } => write!(f, "ENV {name}={}", quoted(value)),
            BuildInstruction::AddArchive { src, dst } => write!(f, "ADD {src} {dst}"),
            BuildInstruction::Cmd(cmd) => {
                let exec = Value::Array(vec![Value::String(cmd.clone())]);
                write!(f, "CMD {exec}")
            }
        }
    }
}

impl fmt::Display for BuildDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instruction in self.instructions() {
            writeln!(f, "{instruction}")?;
        }
        Ok(())
    }
}

/// Render `definition` as the text written to the build-definition file.
pub fn to_dockerfile(definition: &BuildDefinition) -> String {
    definition.to_string()
}

fn quoted(s: &str) -> Value {
    Value::String(s.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn renders_each_instruction_kind() {
        let mut labels = BTreeMap::new();
        labels.insert("io.openshift.s2i.build.source-location".to_string(), "/work/app".to_string());
        labels.insert("io.openshift.s2i.build.image".to_string(), "builder:latest".to_string());

        let def = BuildDefinition::new(vec![
            BuildInstruction::From("builder:latest".into()),
            BuildInstruction::Label(labels),
            BuildInstruction::SetUser(0),
            BuildInstruction::Copy {
                src: "src".into(),
                dst: "/tmp/src".into(),
            },
            BuildInstruction::Run("chown -R 1001:0 /tmp/src".into()),
            BuildInstruction::Env {
                name: "GREETING".into(),
                value: "say \"hi\"".into(),
            },
            BuildInstruction::Run("mkdir /tmp/artifacts".into()),
            BuildInstruction::AddArchive {
                src: "artifacts.tar".into(),
                dst: "/tmp/artifacts".into(),
            },
            BuildInstruction::SetUser(1001),
            BuildInstruction::Run("/usr/libexec/s2i/assemble".into()),
            BuildInstruction::Cmd("/usr/libexec/s2i/run".into()),
        ]);

        let expected = "\
FROM builder:latest
LABEL \"io.openshift.s2i.build.image\"=\"builder:latest\" \\
      \"io.openshift.s2i.build.source-location\"=\"/work/app\"
USER 0
COPY src /tmp/src
RUN chown -R 1001:0 /tmp/src
ENV GREETING=\"say \\\"hi\\\"\"
RUN mkdir /tmp/artifacts
ADD artifacts.tar /tmp/artifacts
USER 1001
RUN /usr/libexec/s2i/assemble
CMD [\"/usr/libexec/s2i/run\"]
";
        assert_eq!(to_dockerfile(&def), expected);
    }

    #[test]
    fn empty_env_value_is_quoted() {
        let env = BuildInstruction::Env {
            name: "EMPTY".into(),
            value: String::new(),
        };
        assert_eq!(env.to_string(), "ENV EMPTY=\"\"");
    }

    #[test]
    fn empty_definition_renders_nothing() {
        assert_eq!(to_dockerfile(&BuildDefinition::default()), "");
    }
}
