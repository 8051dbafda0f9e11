/// How a dependency entry is fetched, inferred from the shape of its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    /// Plain version constraint looked up in the package registry.
    Registry,
    /// `https://…` artifact downloaded as-is.
    DirectUrl,
    /// The `none` sentinel: declared but never fetched.
    None,
    /// `provider:source` for a provider this client has no strategy for.
    Other(String),
}

/// One raw `name = "source"` entry, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpretedDependency {
    pub provider: Provider,
    pub name: String,
    /// Version constraint for `Registry`, URL for `DirectUrl`.
    pub source: String,
    pub is_dev: bool,
}

impl InterpretedDependency {
    pub fn interpret(name: &str, source: &str) -> Self {
        let (provider, source) = if source.starts_with("https://") {
            (Provider::DirectUrl, source.to_string())
        } else if source == "none" {
            (Provider::None, source.to_string())
        } else {
            match source.split_once(':') {
                Some((provider, rest)) => (provider_from_name(provider), rest.to_string()),
                None => (Provider::Registry, source.to_string()),
            }
        };

        Self {
            provider,
            name: name.to_string(),
            source,
            is_dev: false,
        }
    }

    pub fn into_dev(mut self) -> Self {
        self.is_dev = true;
        self
    }
}

fn provider_from_name(name: &str) -> Provider {
    match name {
        "minepack" | "registry" => Provider::Registry,
        "https" => Provider::DirectUrl,
        other => Provider::Other(other.to_string()),
    }
}
