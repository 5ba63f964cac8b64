// Schemata - schema-per-tenant multi-tenancy for PostgreSQL
//
// Tenants live in their own namespaces inside one database; sessions are
// routed to a tenant by changing their search path and are always routed
// back afterwards.

// Re-export core functionality
pub use schemata_core::*;

// Re-export optional crates
#[cfg(feature = "diesel")]
pub use schemata_diesel;

#[cfg(feature = "log")]
pub use schemata_log;

// Prelude for common imports
pub mod prelude {
    pub use schemata_core::prelude::*;

    #[cfg(feature = "diesel")]
    pub use schemata_diesel::{DieselSchemaProvider, PgConfig, TenantConnection, TenantPool};
}
