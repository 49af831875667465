//! Category-scoped request identifiers
//!
//! Each outbound request family draws from its own monotonic counter, so an
//! MDReqID and a SecurityReqID may share a value but two MDReqIDs never do.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Request family an identifier belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestCategory {
    /// MDReqID (262)
    MarketData,
    /// SecurityReqID (320)
    SecurityDefinition,
    /// ClOrdID (11)
    Order,
    /// ExecID (17)
    Execution,
    /// JSON-RPC correlation ids on the relay connection
    Relay,
}

impl fmt::Display for RequestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestCategory::MarketData => "market_data",
            RequestCategory::SecurityDefinition => "security_definition",
            RequestCategory::Order => "order",
            RequestCategory::Execution => "execution",
            RequestCategory::Relay => "relay",
        };
        f.write_str(name)
    }
}

/// Lock-free monotonic id source for one category, starting at 1
#[derive(Debug)]
pub struct RequestIdGenerator {
    category: RequestCategory,
    next: AtomicU64,
}

impl RequestIdGenerator {
    pub fn new(category: RequestCategory) -> Self {
        Self {
            category,
            next: AtomicU64::new(1),
        }
    }

    pub fn category(&self) -> RequestCategory {
        self.category
    }

    /// Issue the next identifier
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Issue the next identifier rendered for a FIX string field
    pub fn next_field(&self) -> String {
        self.next().to_string()
    }

    /// Number of identifiers issued so far
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::Relaxed) - 1
    }
}

/// One generator per [`RequestCategory`]
#[derive(Debug)]
pub struct RequestIds {
    market_data: RequestIdGenerator,
    security_definition: RequestIdGenerator,
    order: RequestIdGenerator,
    execution: RequestIdGenerator,
    relay: RequestIdGenerator,
}

impl RequestIds {
    pub fn new() -> Self {
        Self {
            market_data: RequestIdGenerator::new(RequestCategory::MarketData),
            security_definition: RequestIdGenerator::new(RequestCategory::SecurityDefinition),
            order: RequestIdGenerator::new(RequestCategory::Order),
            execution: RequestIdGenerator::new(RequestCategory::Execution),
            relay: RequestIdGenerator::new(RequestCategory::Relay),
        }
    }

    pub fn get(&self, category: RequestCategory) -> &RequestIdGenerator {
        match category {
            RequestCategory::MarketData => &self.market_data,
            RequestCategory::SecurityDefinition => &self.security_definition,
            RequestCategory::Order => &self.order,
            RequestCategory::Execution => &self.execution,
            RequestCategory::Relay => &self.relay,
        }
    }

    pub fn next(&self, category: RequestCategory) -> u64 {
        self.get(category).next()
    }

    pub fn next_field(&self, category: RequestCategory) -> String {
        self.get(category).next_field()
    }
}

impl Default for RequestIds {
    fn default() -> Self {
        Self::new()
    }
}
