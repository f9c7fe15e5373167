//! The merged GraphQL schema.

use async_graphql::{EmptySubscription, MergedObject, Schema};

use crate::context::ApiContext;
use crate::resolvers::accounts::{AccountsMutation, AccountsQuery};
use crate::resolvers::arrivals::ArrivalsMutation;
use crate::resolvers::directory::{DirectoryMutation, DirectoryQuery};
use crate::resolvers::maps::{MapsMutation, MapsQuery};
use crate::resolvers::servants::ServantMutation;
use crate::resolvers::services::{ServiceMutation, ServiceQuery};

#[derive(MergedObject, Default)]
pub struct QueryRoot(DirectoryQuery, ServiceQuery, MapsQuery, AccountsQuery);

#[derive(MergedObject, Default)]
pub struct MutationRoot(
    DirectoryMutation,
    ServantMutation,
    ServiceMutation,
    ArrivalsMutation,
    AccountsMutation,
    MapsMutation,
);

pub type FlSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the schema. `context` is `None` only when printing the SDL.
pub fn build_schema(context: Option<ApiContext>) -> FlSchema {
    let builder = Schema::build(QueryRoot::default(), MutationRoot::default(), EmptySubscription);
    match context {
        Some(ctx) => builder.data(ctx).finish(),
        None => builder.finish(),
    }
}
