//! `{name}` placeholder templates.
//!
//! `{{` and `}}` render as literal braces. Rendering fails if a
//! placeholder has no value, so a typo in a template is caught on the
//! first call rather than sent to the model.

use anyhow::{bail, Result};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    source: String,
}

impl PromptTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Placeholder names in order of first appearance.
    pub fn placeholders(&self) -> Result<Vec<&str>> {
        let mut names = Vec::new();
        self.walk(|piece| {
            if let Piece::Var(name) = piece {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
            Ok(())
        })?;
        Ok(names)
    }

    pub fn render(&self, values: &[(&str, &str)]) -> Result<String> {
        let values: HashMap<&str, &str> = values.iter().copied().collect();
        let mut out = String::with_capacity(self.source.len());
        self.walk(|piece| {
            match piece {
                Piece::Text(t) => out.push_str(t),
                Piece::Var(name) => match values.get(name) {
                    Some(v) => out.push_str(v),
                    None => bail!("prompt placeholder {{{}}} has no value", name),
                },
            }
            Ok(())
        })?;
        Ok(out)
    }

    fn walk<'a>(&'a self, mut f: impl FnMut(Piece<'a>) -> Result<()>) -> Result<()> {
        let src = self.source.as_str();
        let mut rest = src;
        while let Some(pos) = rest.find(['{', '}']) {
            f(Piece::Text(&rest[..pos]))?;
            let tail = &rest[pos..];
            if tail.starts_with("{{") {
                f(Piece::Text("{"))?;
                rest = &tail[2..];
            } else if tail.starts_with("}}") {
                f(Piece::Text("}"))?;
                rest = &tail[2..];
            } else if tail.starts_with('{') {
                match tail[1..].find('}') {
                    Some(end) => {
                        f(Piece::Var(tail[1..1 + end].trim()))?;
                        rest = &tail[end + 2..];
                    }
                    None => bail!("unclosed '{{' in prompt template"),
                }
            } else {
                bail!("unmatched '}}' in prompt template");
            }
        }
        f(Piece::Text(rest))
    }
}

enum Piece<'a> {
    Text(&'a str),
    Var(&'a str),
}
