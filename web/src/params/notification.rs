use domain::Id;
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
#[schema(as = params::notification::DeleteParams)]
pub(crate) struct DeleteParams {
    #[schema(value_type = Uuid)]
    pub(crate) notification_id: Id,
}
