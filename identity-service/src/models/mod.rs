pub mod auth_record;
pub mod link_edge;
pub mod merged_identity;

pub use auth_record::{
    normalize_email, third_party_external_id, AuthRecord, RecipeAttributes, RecipeKind,
    ThirdPartyInfo,
};
pub use link_edge::LinkEdge;
pub use merged_identity::MergedIdentity;
