use rpc_model::mock::MockSession;
use rpc_model::{
    context_from, normalize_ids, Cardinality, Command, Config, Environment, FieldCatalog,
    ProxyError, Recordset, Registry, RemoteFault, NO_VALUE,
};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

// --- Fixtures ---

fn registry() -> Registry {
    Registry::new()
        .register(
            "res.partner",
            FieldCatalog::builder()
                .field("name")
                .field("email")
                .relation("country_id", Cardinality::ManyToOne, "res.country")
                .relation("category_id", Cardinality::ManyToMany, "res.partner.category")
                .build(),
        )
        .register("res.country", FieldCatalog::builder().field("name").field("code").build())
        .register("res.partner.category", FieldCatalog::builder().field("name").build())
}

fn setup_with(session: MockSession) -> (Arc<MockSession>, Arc<Environment>) {
    let session = Arc::new(session);
    let env = Environment::new(session.clone(), registry());
    (session, env)
}

fn setup() -> (Arc<MockSession>, Arc<Environment>) {
    setup_with(MockSession::new().with_default_context(context_from([("lang", "en_US")])))
}

fn partner_rows(ids: &[i64]) -> Value {
    Value::Array(
        ids.iter()
            .map(|id| {
                json!({
                    "id": id,
                    "name": format!("Partner {id}"),
                    "email": format!("p{id}@example.com")
                })
            })
            .collect(),
    )
}

async fn browse_partners(session: &MockSession, env: &Arc<Environment>, ids: &[i64]) -> Recordset {
    session.expect("res.partner", "read").return_ok(partner_rows(ids));
    env.model("res.partner")
        .unwrap()
        .browse(ids.to_vec())
        .await
        .expect("browse failed")
}

// --- Loading ---

#[tokio::test]
async fn test_browse_caches_every_basic_field() {
    let (session, env) = setup();
    let partners = browse_partners(&session, &env, &[3, 4, 5]).await;

    assert_eq!(partners.ids(), normalize_ids(vec![3, 4, 5]).as_slice());
    assert_eq!(partners.len(), 3);
    assert_eq!(partners.id(), Some(3));
    for id in [3, 4, 5] {
        assert_eq!(partners.cached_value("name", Some(id)), Some(json!(format!("Partner {id}"))));
        let email = json!(format!("p{id}@example.com"));
        assert_eq!(partners.cached_value("email", Some(id)), Some(email));
        assert_eq!(partners.cached_value("country_id", Some(id)), None);
    }

    let read = &session.calls()[0];
    assert_eq!(read.args, vec![json!([3, 4, 5]), json!(["name", "email"])]);
    assert_eq!(read.kwargs["context"], json!({"lang": "en_US"}));
    assert_eq!(read.kwargs["load"], json!("_classic_write"));
    session.verify();
}

#[tokio::test]
async fn test_browse_reports_exactly_the_missing_ids() {
    let (session, env) = setup();
    session.expect("res.partner", "read").return_ok(partner_rows(&[2]));

    let err = env.model("res.partner").unwrap().browse([4, 2, 3]).await.unwrap_err();
    assert!(matches!(&err, ProxyError::RecordNotFound { ids, .. } if ids == &vec![3, 4]));
    assert_eq!(err.to_string(), "There is no 'res.partner' record with IDs [3, 4]");
}

#[tokio::test]
async fn test_virtual_record_holds_defaults() {
    let (session, env) = setup();
    session
        .expect("res.partner", "default_get")
        .return_ok(json!({"name": "Draft", "category_id": []}));

    let draft = env.model("res.partner").unwrap().browse(0).await.unwrap();
    assert_eq!(draft.id(), None);
    assert!(draft.ids().is_empty());
    assert_eq!(draft.value("name").await.unwrap(), json!("Draft"));
    assert_eq!(draft.value("email").await.unwrap(), NO_VALUE);
    assert_eq!(draft.value("category_id").await.unwrap(), json!([]));
    session.verify();
}

#[tokio::test]
async fn test_refresh_twice_is_idempotent() {
    let (session, env) = setup();
    let partners = browse_partners(&session, &env, &[1, 2]).await;
    session.expect("res.partner", "read").return_ok(partner_rows(&[1, 2]));
    session.expect("res.partner", "read").return_ok(partner_rows(&[1, 2]));

    partners.refresh().await.unwrap();
    let first: Vec<_> = [1, 2].iter().map(|&id| partners.cached_value("name", Some(id))).collect();
    partners.refresh().await.unwrap();
    let second: Vec<_> = [1, 2].iter().map(|&id| partners.cached_value("name", Some(id))).collect();
    assert_eq!(first, second);
    session.verify();
}

#[tokio::test]
async fn test_refresh_keeps_staged_writes() {
    let (session, env) = setup();
    let partner = browse_partners(&session, &env, &[1]).await;
    session.expect("res.partner", "read").return_ok(partner_rows(&[1]));

    partner.stage("email", "new@example.com").unwrap();
    partner.refresh().await.unwrap();
    assert_eq!(partner.value("email").await.unwrap(), json!("new@example.com"));
    assert_eq!(partner.pending_values(), context_from([("email", "new@example.com")]));
}

#[tokio::test]
async fn test_relational_field_loaded_on_demand() {
    let (session, env) = setup();
    let partner = browse_partners(&session, &env, &[1]).await;
    session
        .expect("res.partner", "read")
        .return_ok(json!([{"id": 1, "country_id": 21}]));
    session
        .expect("res.country", "read")
        .return_ok(json!([{"id": 21, "name": "Belgium", "code": "BE"}]));

    let country = partner.related("country_id").await.unwrap();
    assert_eq!(country.id(), Some(21));
    assert_eq!(country.value("code").await.unwrap(), json!("BE"));

    let calls = session.calls();
    assert_eq!(calls[1].args, vec![json!([1]), json!(["country_id"])]);
    assert_eq!(calls[1].kwargs["load"], json!("_classic_write"));
    assert_eq!(calls.len(), 3);
}

// --- Context & environments ---

#[tokio::test]
async fn test_with_context_last_write_wins() {
    let (_session, env) = setup();
    let partner = env.model("res.partner").unwrap();
    let rebound = partner.with_context([("a", 1)]).with_context([("a", 2)]);
    assert_eq!(rebound.env().context()["a"], json!(2));
    assert_eq!(rebound.env().lang(), Some("en_US"));
    assert!(partner.env().context().get("a").is_none());
}

#[tokio::test]
async fn test_recordset_with_context_rebrowses_under_new_env() {
    let (session, env) = setup();
    let partner = browse_partners(&session, &env, &[1]).await;
    session.expect("res.partner", "read").return_ok(partner_rows(&[1]));

    let french = partner.with_context([("lang", "fr_FR")]).await.unwrap();
    assert_eq!(french, partner);
    assert!(!french.shares_cache_with(&partner));
    assert!(!Environment::same_scope(french.env(), partner.env()));
    assert_eq!(session.calls()[1].kwargs["context"], json!({"lang": "fr_FR"}));
}

// --- Views, equality ---

#[tokio::test]
async fn test_index_and_iteration_agree() {
    let (session, env) = setup();
    let partners = browse_partners(&session, &env, &[1, 2, 3]).await;

    let first = partners.at(0).unwrap();
    let from_iter = partners.iter().next().unwrap();
    assert_eq!(first, from_iter);
    assert!(first.shares_cache_with(&from_iter));
    assert!(first.parent().is_none());

    let names: Vec<Value> = {
        let mut names = Vec::new();
        for record in partners.iter() {
            names.push(record.value("name").await.unwrap());
        }
        names
    };
    assert_eq!(names, vec![json!("Partner 1"), json!("Partner 2"), json!("Partner 3")]);
    assert_eq!(partners.iter().count(), 3);
    assert_eq!(session.calls().len(), 1);
}

#[tokio::test]
async fn test_equality_and_hashing() {
    let (session, env) = setup();
    let a = browse_partners(&session, &env, &[1, 2]).await;
    let b = browse_partners(&session, &env, &[1, 9]).await;
    session.expect("res.partner.category", "read").return_ok(json!([{"id": 1, "name": "VIP"}]));
    let category = env.model("res.partner.category").unwrap().browse(1).await.unwrap();

    assert_eq!(a, b);
    assert_ne!(a, category);

    let set: HashSet<Recordset> = [a.clone(), b, category].into_iter().collect();
    assert_eq!(set.len(), 2);
    assert_eq!(a.to_string(), "Recordset('res.partner', [1, 2])");
}

// --- Relational edits ---

async fn partner_with_categories(
    session: &MockSession,
    env: &Arc<Environment>,
    categories: Value,
) -> (Recordset, Recordset) {
    let partner = browse_partners(session, env, &[1]).await;
    session
        .expect("res.partner", "read")
        .return_ok(json!([{"id": 1, "category_id": categories}]));
    let ids = normalize_ids(&categories);
    if ids.is_empty() {
        session.expect("res.partner.category", "default_get").return_ok(json!({}));
    } else {
        let rows: Vec<Value> = ids.iter().map(|id| json!({"id": id, "name": "C"})).collect();
        session.expect("res.partner.category", "read").return_ok(Value::Array(rows));
    }
    let categories = partner.related("category_id").await.unwrap();
    (partner, categories)
}

#[tokio::test]
async fn test_add_then_remove_yields_unlink() {
    let (session, env) = setup();
    let (partner, categories) = partner_with_categories(&session, &env, json!([])).await;

    categories.add_and_stage([5]).unwrap();
    let commands = categories.remove_and_stage([5]).unwrap();
    assert_eq!(commands.commands(), &[Command::Unlink(5)]);
    assert_eq!(partner.pending_commands("category_id"), commands);
}

#[tokio::test]
async fn test_remove_then_add_yields_link() {
    let (session, env) = setup();
    let (partner, categories) = partner_with_categories(&session, &env, json!([7])).await;

    categories.remove_and_stage(&categories).unwrap();
    let commands = categories.add_and_stage(7).unwrap();
    assert_eq!(commands.commands(), &[Command::Link(7)]);
    assert_eq!(partner.pending_values()["category_id"], json!([[4, 7]]));
}

#[tokio::test]
async fn test_unstaged_add_leaves_parent_untouched() {
    let (session, env) = setup();
    let (partner, categories) = partner_with_categories(&session, &env, json!([])).await;

    let preview = categories.add(vec![2, 3]).unwrap();
    assert_eq!(preview.commands(), &[Command::Link(2), Command::Link(3)]);
    assert!(partner.pending_commands("category_id").is_empty());

    partner.stage_commands("category_id", preview).unwrap();
    assert_eq!(partner.pending_values()["category_id"], json!([[4, 2], [4, 3]]));
}

#[tokio::test]
async fn test_edit_without_parent_is_rejected() {
    let (session, env) = setup();
    let partners = browse_partners(&session, &env, &[1, 2]).await;
    for result in [partners.add(3), partners.remove(3), partners.at(0).unwrap().add(3)] {
        assert!(matches!(result, Err(ProxyError::InternalError(_))));
    }
}

// --- Dispatch ---

#[tokio::test]
async fn test_instance_dispatch_prepends_ids_and_injects_context() {
    let (session, env) = setup();
    let partners = browse_partners(&session, &env, &[1, 2]).await;
    session.expect("res.partner", "foo").return_ok(json!({"done": true}));

    let result = partners
        .call("foo")
        .unwrap()
        .arg("bar")
        .kwarg("force", true)
        .send()
        .await
        .unwrap();
    assert_eq!(result, json!({"done": true}));

    let call = &session.calls()[1];
    assert_eq!(call.method, "foo");
    assert_eq!(call.args, vec![json!([1, 2]), json!("bar")]);
    assert_eq!(call.kwargs["context"], json!({"lang": "en_US"}));
    assert_eq!(call.kwargs["force"], json!(true));
}

#[tokio::test]
async fn test_class_dispatch_without_auto_context() {
    let config = Config::default().with_auto_context(false);
    let (session, env) = setup_with(MockSession::new().with_config(config));
    session.expect("res.partner", "fields_get").return_ok(json!({}));

    env.model("res.partner").unwrap().call("fields_get").unwrap().send().await.unwrap();
    let call = &session.calls()[0];
    assert!(call.args.is_empty());
    assert!(call.kwargs.is_empty());
}

#[tokio::test]
async fn test_remote_fault_propagates_unchanged() {
    let (session, env) = setup();
    let partners = browse_partners(&session, &env, &[1]).await;
    let fault = RemoteFault::Validation("email is invalid".into());
    session.expect("res.partner", "write").return_err(fault.clone());

    let err = partners.write(context_from([("email", "x")])).await.unwrap_err();
    assert!(matches!(err, ProxyError::Remote(f) if f == fault));
}

#[tokio::test]
async fn test_reserved_names_never_reach_the_server() {
    let (session, env) = setup();
    let partners = browse_partners(&session, &env, &[1]).await;
    for name in ["ids", "env", "_read", "__init__"] {
        assert!(matches!(partners.call(name), Err(ProxyError::NotDispatchable(_))));
    }
    assert_eq!(session.calls().len(), 1);
}

// --- Typed operations ---

#[tokio::test]
async fn test_create_and_save_round_trip() {
    let (session, env) = setup();
    session
        .expect("res.partner", "default_get")
        .return_ok(json!({"name": false, "email": false}));
    session.expect("res.partner", "create").return_ok(json!(42));
    session.expect("res.partner", "read").return_ok(partner_rows(&[42]));
    session.expect("res.partner", "name_get").return_ok(json!([[42, "Partner 42"]]));

    let draft = env.model("res.partner").unwrap().browse(()).await.unwrap();
    draft.stage("name", "Partner 42").unwrap();
    let created = draft.save().await.unwrap();

    assert_eq!(created.id(), Some(42));
    assert!(draft.pending_values().is_empty());
    assert_eq!(created.name_get().await.unwrap(), vec![(42, "Partner 42".to_string())]);
    session.verify();
}

#[tokio::test]
async fn test_search_count_and_name_search() {
    let (session, env) = setup();
    let partner = env.model("res.partner").unwrap();
    session.expect("res.partner", "search_count").return_ok(json!(3));
    session
        .expect("res.partner", "name_search")
        .return_ok(json!([[1, "Azure"], [4, "Azure Interior"]]));

    assert_eq!(partner.search_count(json!([])).await.unwrap(), 3);
    let found = partner.name_search("Azure").await.unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[1], (4, "Azure Interior".to_string()));
}

#[tokio::test]
async fn test_decode_error_on_unexpected_shape() {
    let (session, env) = setup();
    session.expect("res.partner", "search_count").return_ok(json!("three"));
    let err = env.model("res.partner").unwrap().search_count(json!([])).await.unwrap_err();
    assert!(matches!(err, ProxyError::Decode(_)));
}
