//! Query Engine Module
//!
//! A small interpreter: a declarative [`QuerySpec`] is compiled into a typed
//! [`QueryPlan`] (version mode, predicates, sort keys, pagination window), the
//! plan picks candidate sequences from the version index, and a
//! [`QueryCursor`] reads, filters, sorts and paginates them lazily.
//!
//! ```text
//!   QuerySpec ──compile──▶ QueryPlan ──candidates(index, snapshot)──▶ [seq]
//!                                                                       │
//!                                           QueryCursor ◀──read_at──────┘
//! ```
//!
//! | Spec field | Effect |
//! |---|---|
//! | `entity-type` | required; scopes everything else |
//! | `id` | single entity; filters are ignored when present |
//! | `versions: "all"` | every version instead of the latest |
//! | `as-of: T` | newest version with timestamp `<= T` (ties: later write) |
//! | `filters` | exact value, `[">", v]`, `["<", v]`, `[">=", v]`, `["<=", v]`, `["between", lo, hi]`, `["=", v]` |
//! | `order-by` | stable multi-key sort; default ascending sequence |
//! | `limit`, `offset` | applied after filtering and sorting |

mod cursor;
mod plan;
mod predicate;
mod spec;

pub use cursor::QueryCursor;
pub use plan::{QueryPlan, VersionMode};
pub use predicate::{compare_values, Field, Predicate, SortDirection, SortKey};
pub use spec::QuerySpec;
