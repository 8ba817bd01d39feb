use std::path::Path;
use std::sync::Arc;

use minijinja::Environment;
use serde::Serialize;

use crate::view::ViewError;

/// A shared, immutable template environment.
///
/// Templates whose names end in `.html` are auto-escaped.
#[derive(Clone)]
pub struct Templates {
    env: Arc<Environment<'static>>,
}

impl Templates {
    /// Load templates lazily from `dir`; names are paths relative to it.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let mut env = Environment::new();
        env.set_loader(minijinja::path_loader(dir.as_ref().to_path_buf()));
        Self { env: Arc::new(env) }
    }

    /// Compile `(name, source)` pairs up front.
    pub fn from_sources<I, N, T>(sources: I) -> Result<Self, ViewError>
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<String>,
    {
        let mut env = Environment::new();
        for (name, source) in sources {
            env.add_template_owned(name.into(), source.into())?;
        }
        Ok(Self { env: Arc::new(env) })
    }

    pub fn render<C: Serialize>(&self, name: &str, context: C) -> Result<String, ViewError> {
        let template = self.env.get_template(name)?;
        Ok(template.render(context)?)
    }
}

impl std::fmt::Debug for Templates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Templates").finish_non_exhaustive()
    }
}
