//! Root command registry.
//!
//! Stores every registered [`CommandSpec`] and looks commands up by name or
//! alias, case-insensitively.

use std::collections::HashMap;

use crate::spec::CommandSpec;

/// Registry of root commands.
pub struct CommandRegistry<S> {
    /// Map from lowercase primary name to definition.
    commands: HashMap<String, CommandSpec<S>>,
    /// Map from lowercase alias to lowercase primary name.
    aliases: HashMap<String, String>,
}

impl<S> CommandRegistry<S> {
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
            aliases: HashMap::new(),
        }
    }

    /// Registers a command.
    ///
    /// If a command with the same name exists, the new subcommands and
    /// aliases are appended to it.
    pub fn insert(&mut self, spec: CommandSpec<S>) {
        let key = spec.name.to_lowercase();
        for alias in &spec.aliases {
            self.aliases.insert(alias.to_lowercase(), key.clone());
        }

        match self.commands.get_mut(&key) {
            Some(existing) => {
                for alias in spec.aliases {
                    if !existing.aliases.iter().any(|a| a.eq_ignore_ascii_case(&alias)) {
                        existing.aliases.push(alias);
                    }
                }
                if existing.description.is_none() {
                    existing.description = spec.description;
                }
                existing.subcommands.extend(spec.subcommands);
            }
            None => {
                self.commands.insert(key, spec);
            }
        }
    }

    /// Removes a command and its aliases. Accepts the name or an alias.
    pub fn remove(&mut self, name: &str) -> Option<CommandSpec<S>> {
        let key = self.primary_key(name)?;
        self.aliases.retain(|_, primary| *primary != key);
        self.commands.remove(&key)
    }

    /// Gets a command by name or alias.
    pub fn get(&self, name: &str) -> Option<&CommandSpec<S>> {
        let key = self.primary_key(name)?;
        self.commands.get(&key)
    }

    fn primary_key(&self, name: &str) -> Option<String> {
        let name_lower = name.to_lowercase();
        if self.commands.contains_key(&name_lower) {
            return Some(name_lower);
        }
        self.aliases.get(&name_lower).cloned()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Primary names as registered, sorted.
    pub fn command_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.commands.values().map(|c| c.name()).collect();
        names.sort_unstable();
        names
    }

    /// Primary names and aliases, sorted and deduplicated.
    pub fn all_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self
            .commands
            .values()
            .flat_map(|c| std::iter::once(c.name()).chain(c.aliases().iter().map(String::as_str)))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandSpec<S>> {
        self.commands.values()
    }
}

impl<S> Default for CommandRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> std::fmt::Debug for CommandRegistry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.command_names())
            .finish()
    }
}
