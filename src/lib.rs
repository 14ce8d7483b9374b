//! Cluster security layer for distributed data nodes.
//!
//! This crate decides, for every operation executed inside a cluster node,
//! which subject's identity and permission set is currently active, propagates
//! that identity across the membership protocol through node attributes, and
//! optionally forces untrusted user callees through a privilege-reducing
//! sandbox channel.

pub mod config;
pub mod context;
pub mod error;
pub mod node;
pub mod permissions;
pub mod sandbox;
pub mod security;

pub use context::scope::{self, OperationContextGuard};
pub use context::{SecurityContext, SecurityCredentials, SecuritySubject, SubjectType};
pub use error::{SecurityError, SecurityResult};
pub use node::auth::{authenticate_local_node, NodeAuthenticator, SignatureNodeAuthenticator};
pub use node::codec::{
    node_security_context, with_security_context, JsonMarshaller, MarshalError, Marshaller,
};
pub use node::{ClusterNode, NodeAttributes, ATTR_AUTHENTICATION_ENABLED, ATTR_SECURITY_SUBJECT};
pub use permissions::authorize::authorize_all;
pub use permissions::{
    compatible_service_permissions, PermissionSet, PermissionSetBuilder, SecurityPermission,
};
pub use sandbox::classifier;
pub use sandbox::gate::{sandboxed_proxy, unwrap_target, SandboxTarget};
pub use sandbox::{is_inside_sandbox, NoopSandbox, Sandbox, SandboxScope};
pub use security::{
    remote_security_context, security_subject_id, with_remote_security_context,
    BasicClusterSecurity, ClusterSecurity, NoopClusterSecurity, SecurityConfig,
    SecurityConfigBuilder,
};
