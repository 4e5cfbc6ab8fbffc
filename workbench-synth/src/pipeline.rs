//! Composition of fallible stages, with named intermediate results.

use std::collections::HashMap;

use anyhow::{bail, Context, Error};

/// The named values produced along a [`Pipeline`].
#[derive(Debug, Clone)]
pub struct Stash<T> {
    values: HashMap<String, T>,
}

impl<T> Default for Stash<T> {
    fn default() -> Self {
        Stash {
            values: HashMap::new(),
        }
    }
}

impl<T> Stash<T> {
    /// Look up a value kept by a previous stage.
    pub fn get(&self, name: &str) -> Result<&T, Error> {
        match self.values.get(name) {
            Some(value) => Ok(value),
            None => bail!("No value named {} was kept", name),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    fn insert(&mut self, name: &str, value: T) {
        self.values.insert(name.to_string(), value);
    }
}

/// A value passed through a chain of stages.
///
/// Every stage gets the current value and the [`Stash`] of the named values kept so far. The
/// output of [`Pipeline::then`] is kept under the name of the stage, so that later stages can
/// `use` it. The first failing stage stops the chain.
///
/// ```
/// use workbench_synth::Pipeline;
///
/// let pipeline = Pipeline::new(20)
///     .then("double", |v, _| Ok(v * 2))?
///     .keep("half", |v, _| Ok(v / 2))?
///     .then("sum", |v, stash| Ok(v + stash.get("half")?))?;
/// assert_eq!(*pipeline.value(), 60);
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline<T> {
    value: T,
    stash: Stash<T>,
}

impl<T: Clone> Pipeline<T> {
    pub fn new(value: T) -> Self {
        Pipeline {
            value,
            stash: Stash::default(),
        }
    }

    /// Replace the current value with `f(value)`, keeping the result under `name`.
    pub fn then<F>(mut self, name: &str, f: F) -> Result<Self, Error>
    where
        F: FnOnce(T, &Stash<T>) -> Result<T, Error>,
    {
        trace!("Pipeline stage {}", name);
        let value = f(self.value, &self.stash).with_context(|| format!("Stage {} failed", name))?;
        self.stash.insert(name, value.clone());
        self.value = value;
        Ok(self)
    }

    /// Keep `f(value)` under `name`, leaving the current value untouched.
    pub fn keep<F>(mut self, name: &str, f: F) -> Result<Self, Error>
    where
        F: FnOnce(&T, &Stash<T>) -> Result<T, Error>,
    {
        trace!("Pipeline stage {} (kept)", name);
        let kept = f(&self.value, &self.stash).with_context(|| format!("Stage {} failed", name))?;
        self.stash.insert(name, kept);
        Ok(self)
    }

    /// `f` returns the new current value and one extra value for each of `names`.
    pub fn then_and_keep<F>(mut self, names: &[&str], f: F) -> Result<Self, Error>
    where
        F: FnOnce(T, &Stash<T>) -> Result<(T, Vec<T>), Error>,
    {
        let stage = names.join(",");
        trace!("Pipeline stage {} (split)", stage);
        let (value, extra) =
            f(self.value, &self.stash).with_context(|| format!("Stage {} failed", stage))?;
        if extra.len() != names.len() {
            bail!(
                "Stage {} produced {} values to keep instead of {}",
                stage,
                extra.len(),
                names.len()
            );
        }
        for (name, kept) in names.iter().zip(extra) {
            self.stash.insert(name, kept);
        }
        self.value = value;
        Ok(self)
    }

    /// Call `f` only for its side effects.
    pub fn first<F>(self, f: F) -> Result<Self, Error>
    where
        F: FnOnce(&T) -> Result<(), Error>,
    {
        f(&self.value)?;
        Ok(self)
    }

    /// Look up a value kept by a previous stage.
    pub fn use_kept(&self, name: &str) -> Result<&T, Error> {
        self.stash.get(name)
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn stash(&self) -> &Stash<T> {
        &self.stash
    }

    pub fn into_value(self) -> T {
        self.value
    }
}
