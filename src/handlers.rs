//! Default transport handlers
//!
//! Handlers are the extensions baked into the transport when it is built:
//! redirect behaviour, proxying, a cookie store, a request timeout. Each
//! belongs to a [`HandlerKind`] family and the registry holds at most one
//! handler per family, in insertion order.

use std::fmt;
use std::time::Duration;

use tracing::debug;
use url::Url;

/// How the transport treats 3xx responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectPolicy {
    /// Follow up to this many hops
    Limited(usize),
    /// Hand 3xx responses back untouched
    None,
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        RedirectPolicy::Limited(10)
    }
}

/// Handler family tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Redirect,
    Proxy,
    Cookies,
    Timeout,
}

/// A transport extension.
#[derive(Debug, Clone, PartialEq)]
pub enum Handler {
    Redirect(RedirectPolicy),
    Proxy(Url),
    /// In-memory cookie store shared across requests
    Cookies,
    Timeout(Duration),
}

impl Handler {
    pub fn kind(&self) -> HandlerKind {
        match self {
            Handler::Redirect(_) => HandlerKind::Redirect,
            Handler::Proxy(_) => HandlerKind::Proxy,
            Handler::Cookies => HandlerKind::Cookies,
            Handler::Timeout(_) => HandlerKind::Timeout,
        }
    }
}

impl fmt::Display for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Redirect(RedirectPolicy::Limited(n)) => write!(f, "redirect(max {n})"),
            Handler::Redirect(RedirectPolicy::None) => f.write_str("redirect(off)"),
            Handler::Proxy(url) => write!(f, "proxy({url})"),
            Handler::Cookies => f.write_str("cookies"),
            Handler::Timeout(d) => write!(f, "timeout({}s)", d.as_secs_f64()),
        }
    }
}

/// Ordered handler list, one entry per [`HandlerKind`].
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    handlers: Vec<Handler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler`, dropping any earlier handler of the same family.
    pub fn add(&mut self, handler: Handler) {
        let kind = handler.kind();
        self.handlers.retain(|existing| {
            let keep = existing.kind() != kind;
            if !keep {
                debug!("Remove {existing} from default handlers");
            }
            keep
        });
        debug!("Add {handler} to default handlers");
        self.handlers.push(handler);
    }

    /// Handler registered for `kind`, if any.
    pub fn get(&self, kind: HandlerKind) -> Option<&Handler> {
        self.handlers.iter().find(|h| h.kind() == kind)
    }

    /// Handlers in registration order
    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
