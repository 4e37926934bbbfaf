//! Per-run shared state.
//!
//! One [`RunContext`] lives for a whole run, across all modules. It owns the
//! registry, the source unit arena, the RPC identifier tables and the
//! diagnostic log. Passes borrow it mutably one at a time.

use std::fmt;
use std::path::{Path, PathBuf};

use log::warn;
use rustc_hash::FxHashMap;

use crate::config::RunConfig;
use crate::declare::PendingMember;
use crate::error::{Error, Result};
use crate::module::unit::{SourceUnit, UnitId};
use crate::registry::Registry;

/// A non-fatal diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub file: PathBuf,
    pub line: u32,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}): warning: {}", self.file.display(), self.line, self.message)
    }
}

/// A function that claimed an RPC identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcClaim {
    pub function: String,
    pub file: PathBuf,
    pub line: u32,
}

#[derive(Debug)]
pub struct RunContext {
    pub config: RunConfig,
    pub registry: Registry,
    pub units: Vec<SourceUnit>,
    /// Units in the order they finished processing.
    pub processed: Vec<UnitId>,
    /// Members waiting for type resolution, per unit, in declaration order.
    pub pending: FxHashMap<UnitId, Vec<PendingMember>>,
    /// RPC identifiers in use.
    pub rpc_ids: FxHashMap<u16, RpcClaim>,
    /// Response identifiers requested before any function claimed them.
    pub rpc_awaiting_response: FxHashMap<u16, RpcClaim>,
    pub warnings: Vec<Warning>,
    file_stack: Vec<PathBuf>,
}

impl RunContext {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            registry: Registry::new(),
            units: Vec::new(),
            processed: Vec::new(),
            pending: FxHashMap::default(),
            rpc_ids: FxHashMap::default(),
            rpc_awaiting_response: FxHashMap::default(),
            warnings: Vec::new(),
            file_stack: Vec::new(),
        }
    }

    pub fn unit(&self, id: UnitId) -> &SourceUnit {
        &self.units[id.index()]
    }

    pub fn unit_mut(&mut self, id: UnitId) -> &mut SourceUnit {
        &mut self.units[id.index()]
    }

    pub fn push_file(&mut self, path: PathBuf) {
        self.file_stack.push(path);
    }

    pub fn pop_file(&mut self) -> Option<PathBuf> {
        self.file_stack.pop()
    }

    /// File currently being processed, innermost first.
    pub fn current_file(&self) -> Option<&Path> {
        self.file_stack.last().map(PathBuf::as_path)
    }

    /// Record a non-fatal diagnostic against the current file.
    pub fn warn(&mut self, line: u32, message: impl Into<String>) {
        let warning = Warning {
            file: self.current_file().map(Path::to_path_buf).unwrap_or_default(),
            line,
            message: message.into(),
        };
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// Claim an RPC identifier for `function`.
    pub fn claim_rpc_id(&mut self, id: u16, function: &str, line: u32, is_response: bool) -> Result<()> {
        if let Some(existing) = self.rpc_ids.get(&id) {
            return Err(Error::semantic(
                line,
                format!(
                    "Function '{}' already uses identifier {} ({}:{})",
                    existing.function,
                    id,
                    existing.file.display(),
                    existing.line
                ),
            ));
        }
        let claim = self.rpc_claim(function, line);
        self.rpc_ids.insert(id, claim);
        if is_response {
            self.rpc_awaiting_response.remove(&id);
        }
        Ok(())
    }

    /// Note that `function` expects a response function with identifier `id`.
    pub fn request_rpc_response(&mut self, id: u16, function: &str, line: u32) {
        if !self.rpc_ids.contains_key(&id) {
            let claim = self.rpc_claim(function, line);
            self.rpc_awaiting_response.insert(id, claim);
        }
    }

    /// Fail on the first response identifier no function has claimed.
    pub fn check_rpc_responses(&self) -> Result<()> {
        let mut missing: Vec<(&u16, &RpcClaim)> = self.rpc_awaiting_response.iter().collect();
        missing.sort_by_key(|(id, _)| **id);
        match missing.first() {
            Some((id, claim)) => Err(Error::semantic(
                claim.line,
                format!(
                    "Request function '{}' is missing a response function with the id of '{}'",
                    claim.function, id
                ),
            )
            .with_file(claim.file.clone())),
            None => Ok(()),
        }
    }

    fn rpc_claim(&self, function: &str, line: u32) -> RpcClaim {
        RpcClaim {
            function: function.to_string(),
            file: self.current_file().map(Path::to_path_buf).unwrap_or_default(),
            line,
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(RunConfig::default())
    }
}
