//! GraphQL schema over the task and account services
//!
//! Resolvers only translate arguments and results; every rule lives in the
//! services. Service errors carry their `code()` as a GraphQL extension.

use async_graphql::{
    Context, EmptySubscription, ErrorExtensions, InputObject, Object, Schema, SimpleObject, ID,
};

use crate::accounts::{AccountService, AuthPayload, Credentials, User};
use crate::auth::get_principal;
use crate::guard::require_authenticated;
use crate::pagination::{CursorCodec, Page, PageInfo, PaginationInput};
use crate::service::TaskService;
use crate::task::{NewTask, Task, TaskId, TaskPatch};
use crate::types::Timestamp;
use crate::ServiceError;

pub type TaskSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the schema with both services attached as context data
pub fn build_schema(tasks: TaskService, accounts: AccountService) -> TaskSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(tasks)
        .data(accounts)
        .finish()
}

fn gql<T>(result: crate::Result<T>) -> async_graphql::Result<T> {
    result.map_err(|e| e.extend())
}

fn parse_task_id(id: &ID) -> async_graphql::Result<TaskId> {
    gql(id
        .parse::<TaskId>()
        .map_err(|_| ServiceError::ValidationFailed(format!("'{}' is not a task id", id.as_str()))))
}

/// Task as exposed over GraphQL
pub struct TaskNode(pub Task);

#[Object(name = "Task")]
impl TaskNode {
    async fn id(&self) -> ID {
        ID(self.0.id.to_string())
    }

    async fn owner_id(&self) -> ID {
        ID(self.0.owner_id.to_string())
    }

    async fn title(&self) -> &str {
        &self.0.title
    }

    async fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }

    async fn completed(&self) -> bool {
        self.0.completed
    }

    async fn created_at(&self) -> Timestamp {
        self.0.created_at.into()
    }

    async fn updated_at(&self) -> Timestamp {
        self.0.updated_at.into()
    }
}

/// Account as exposed over GraphQL; the password hash never leaves the service
pub struct UserNode(pub User);

#[Object(name = "User")]
impl UserNode {
    async fn id(&self) -> ID {
        ID(self.0.id.to_string())
    }

    async fn email(&self) -> &str {
        &self.0.email
    }

    async fn created_at(&self) -> Timestamp {
        self.0.created_at.into()
    }
}

#[derive(SimpleObject)]
pub struct TaskEdge {
    pub cursor: String,
    pub node: TaskNode,
}

#[derive(SimpleObject)]
pub struct TaskConnection {
    pub edges: Vec<TaskEdge>,
    pub page_info: PageInfo,
    pub total_count: i64,
}

impl From<Page<Task>> for TaskConnection {
    fn from(page: Page<Task>) -> Self {
        let page_info = PageInfo::from_page(&page);
        let total_count = page.total_count as i64;
        let edges = page
            .items
            .into_iter()
            .map(|task| TaskEdge {
                cursor: CursorCodec::encode_cursor(&task.id),
                node: TaskNode(task),
            })
            .collect();

        Self {
            edges,
            page_info,
            total_count,
        }
    }
}

#[derive(SimpleObject)]
#[graphql(name = "AuthPayload")]
pub struct AuthPayloadObject {
    pub token: String,
    pub user: UserNode,
}

impl From<AuthPayload> for AuthPayloadObject {
    fn from(payload: AuthPayload) -> Self {
        Self {
            token: payload.token,
            user: UserNode(payload.user),
        }
    }
}

#[derive(InputObject)]
pub struct CreateTaskInput {
    pub title: String,
    pub description: Option<String>,
}

#[derive(InputObject)]
pub struct UpdateTaskInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

#[derive(InputObject)]
pub struct CredentialsInput {
    pub email: String,
    pub password: String,
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Tasks of the caller, newest first
    async fn tasks(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        after: Option<String>,
    ) -> async_graphql::Result<TaskConnection> {
        let principal = gql(require_authenticated(get_principal(ctx)))?;
        let request = gql(PaginationInput { first, after }.into_request::<TaskId>())?;
        let page = gql(ctx.data::<TaskService>()?.list(Some(principal), request).await)?;
        Ok(page.into())
    }

    async fn task(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<TaskNode> {
        let id = parse_task_id(&id)?;
        let task = gql(ctx.data::<TaskService>()?.get(get_principal(ctx), id).await)?;
        Ok(TaskNode(task))
    }

    async fn me(&self, ctx: &Context<'_>) -> async_graphql::Result<UserNode> {
        let user = gql(ctx.data::<AccountService>()?.me(get_principal(ctx)).await)?;
        Ok(UserNode(user))
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn create_task(&self, ctx: &Context<'_>, input: CreateTaskInput) -> async_graphql::Result<TaskNode> {
        let new_task = NewTask {
            title: input.title,
            description: input.description,
        };
        let task = gql(ctx.data::<TaskService>()?.create(get_principal(ctx), new_task).await)?;
        Ok(TaskNode(task))
    }

    async fn update_task(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: UpdateTaskInput,
    ) -> async_graphql::Result<TaskNode> {
        let id = parse_task_id(&id)?;
        let patch = TaskPatch {
            title: input.title,
            description: input.description,
            completed: input.completed,
        };
        let task = gql(ctx.data::<TaskService>()?.update(get_principal(ctx), id, patch).await)?;
        Ok(TaskNode(task))
    }

    async fn toggle_task(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<TaskNode> {
        let id = parse_task_id(&id)?;
        let task = gql(ctx.data::<TaskService>()?.toggle(get_principal(ctx), id).await)?;
        Ok(TaskNode(task))
    }

    async fn delete_task(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<TaskNode> {
        let id = parse_task_id(&id)?;
        let task = gql(ctx.data::<TaskService>()?.delete(get_principal(ctx), id).await)?;
        Ok(TaskNode(task))
    }

    async fn register(&self, ctx: &Context<'_>, input: CredentialsInput) -> async_graphql::Result<AuthPayloadObject> {
        let credentials = Credentials::new(input.email, input.password);
        let payload = gql(ctx.data::<AccountService>()?.register(credentials).await)?;
        Ok(payload.into())
    }

    async fn login(&self, ctx: &Context<'_>, input: CredentialsInput) -> async_graphql::Result<AuthPayloadObject> {
        let credentials = Credentials::new(input.email, input.password);
        let payload = gql(ctx.data::<AccountService>()?.login(credentials).await)?;
        Ok(payload.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, PaginationConfig};
    use crate::identity::{IdentityResolver, JwtCredentials, Principal};
    use crate::store::{MemoryTaskStore, MemoryUserStore};
    use async_graphql::{Request, Value};
    use serde_json::json;
    use std::sync::Arc;

    struct Harness {
        schema: TaskSchema,
        identity: IdentityResolver,
    }

    impl Harness {
        fn new() -> Self {
            let creds = Arc::new(JwtCredentials::new(
                &AuthConfig::new("0123456789abcdef0123456789abcdef").unwrap(),
            ));
            let tasks = TaskService::new(Arc::new(MemoryTaskStore::new()), PaginationConfig::default());
            let accounts = AccountService::new(Arc::new(MemoryUserStore::new()), creds.clone());
            Self {
                schema: build_schema(tasks, accounts),
                identity: IdentityResolver::new(creds),
            }
        }

        async fn run(&self, query: &str, principal: Option<Principal>) -> async_graphql::Response {
            let mut request = Request::new(query);
            if let Some(principal) = principal {
                request = request.data(principal);
            }
            self.schema.execute(request).await
        }

        async fn ok(&self, query: &str, principal: Option<Principal>) -> serde_json::Value {
            let response = self.run(query, principal).await;
            assert!(response.errors.is_empty(), "{:?}", response.errors);
            response.data.into_json().unwrap()
        }

        async fn error_code(&self, query: &str, principal: Option<Principal>) -> Value {
            let response = self.run(query, principal).await;
            let error = response.errors.first().expect("expected an error");
            error
                .extensions
                .as_ref()
                .and_then(|ext| ext.get("code"))
                .cloned()
                .expect("error without code")
        }

        async fn register(&self, email: &str) -> Principal {
            let data = self
                .ok(
                    &format!(
                        r#"mutation {{ register(input: {{ email: "{}", password: "long enough" }}) {{ token user {{ email }} }} }}"#,
                        email
                    ),
                    None,
                )
                .await;
            let token = data["register"]["token"].as_str().unwrap();
            self.identity.resolve(Some(token)).unwrap()
        }
    }

    #[tokio::test]
    async fn test_register_and_me() {
        let harness = Harness::new();
        let principal = harness.register("ada@example.com").await;

        let data = harness.ok("{ me { id email } }", Some(principal)).await;
        assert_eq!(data["me"]["email"], json!("ada@example.com"));
        assert_eq!(data["me"]["id"], json!(principal.id.to_string()));
    }

    #[tokio::test]
    async fn test_login_with_wrong_password() {
        let harness = Harness::new();
        harness.register("ada@example.com").await;

        let code = harness
            .error_code(
                r#"mutation { login(input: { email: "ada@example.com", password: "nope nope" }) { token } }"#,
                None,
            )
            .await;
        assert_eq!(code, Value::from("INVALID_CREDENTIALS"));
    }

    #[tokio::test]
    async fn test_task_lifecycle() {
        let harness = Harness::new();
        let alice = harness.register("alice@example.com").await;

        let data = harness
            .ok(
                r#"mutation { createTask(input: { title: "Water plants" }) { id title completed } }"#,
                Some(alice),
            )
            .await;
        let id = data["createTask"]["id"].as_str().unwrap().to_string();
        assert_eq!(data["createTask"]["completed"], json!(false));

        let data = harness
            .ok(&format!(r#"mutation {{ toggleTask(id: "{}") {{ completed }} }}"#, id), Some(alice))
            .await;
        assert_eq!(data["toggleTask"]["completed"], json!(true));

        let data = harness
            .ok(
                &format!(
                    r#"mutation {{ updateTask(id: "{}", input: {{ description: "twice a week" }}) {{ description }} }}"#,
                    id
                ),
                Some(alice),
            )
            .await;
        assert_eq!(data["updateTask"]["description"], json!("twice a week"));

        let data = harness
            .ok(&format!(r#"mutation {{ deleteTask(id: "{}") {{ id }} }}"#, id), Some(alice))
            .await;
        assert_eq!(data["deleteTask"]["id"], json!(id));

        let code = harness
            .error_code(&format!(r#"{{ task(id: "{}") {{ id }} }}"#, id), Some(alice))
            .await;
        assert_eq!(code, Value::from("NOT_FOUND"));
    }

    #[tokio::test]
    async fn test_tasks_connection_pages() {
        let harness = Harness::new();
        let alice = harness.register("alice@example.com").await;
        for n in 0..3 {
            harness
                .ok(
                    &format!(r#"mutation {{ createTask(input: {{ title: "Task {}" }}) {{ id }} }}"#, n),
                    Some(alice),
                )
                .await;
        }

        let query = "{ tasks(first: 2) { totalCount edges { cursor node { title } } pageInfo { hasNextPage hasPreviousPage endCursor } } }";
        let data = harness.ok(query, Some(alice)).await;
        let tasks = &data["tasks"];
        assert_eq!(tasks["totalCount"], json!(3));
        assert_eq!(tasks["edges"].as_array().unwrap().len(), 2);
        assert_eq!(tasks["pageInfo"]["hasNextPage"], json!(true));
        assert_eq!(tasks["pageInfo"]["endCursor"], tasks["edges"][1]["cursor"]);

        let end = tasks["pageInfo"]["endCursor"].as_str().unwrap();
        let query = format!(
            r#"{{ tasks(first: 2, after: "{}") {{ edges {{ node {{ title }} }} pageInfo {{ hasNextPage hasPreviousPage }} }} }}"#,
            end
        );
        let data = harness.ok(&query, Some(alice)).await;
        assert_eq!(data["tasks"]["edges"].as_array().unwrap().len(), 1);
        assert_eq!(data["tasks"]["pageInfo"]["hasNextPage"], json!(false));
        assert_eq!(data["tasks"]["pageInfo"]["hasPreviousPage"], json!(true));
    }

    #[tokio::test]
    async fn test_error_codes() {
        let harness = Harness::new();
        let alice = harness.register("alice@example.com").await;
        let bob = harness.register("bob@example.com").await;

        let anonymous = harness.error_code("{ tasks { totalCount } }", None).await;
        assert_eq!(anonymous, Value::from("UNAUTHENTICATED"));

        let bad_cursor = harness
            .error_code(r#"{ tasks(after: "bm9wZQ==") { totalCount } }"#, Some(alice))
            .await;
        assert_eq!(bad_cursor, Value::from("INVALID_CURSOR"));

        let data = harness
            .ok(r#"mutation { createTask(input: { title: "Alice only" }) { id } }"#, Some(alice))
            .await;
        let id = data["createTask"]["id"].as_str().unwrap();
        let forbidden = harness
            .error_code(&format!(r#"mutation {{ toggleTask(id: "{}") {{ id }} }}"#, id), Some(bob))
            .await;
        assert_eq!(forbidden, Value::from("FORBIDDEN"));

        let malformed = harness
            .error_code(r#"{ task(id: "42") { id } }"#, Some(alice))
            .await;
        assert_eq!(malformed, Value::from("BAD_USER_INPUT"));
    }
}
