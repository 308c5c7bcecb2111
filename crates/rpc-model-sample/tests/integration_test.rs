use rpc_model::{context_from, Command, ProxyError, RemoteFault};
use rpc_model_sample::lifecycle::DemoSystem;
use serde_json::json;

/// Full end-to-end test: proxies over a running server actor.
#[tokio::test]
async fn test_browse_and_relations_against_server() {
    let system = DemoSystem::new();
    let partner = system.env.model("res.partner").expect("model not registered");

    let companies = partner
        .search_browse(json!([["is_company", "=", true]]))
        .await
        .expect("Failed to browse companies");
    assert_eq!(companies.ids(), &[1, 2]);
    assert_eq!(companies.value("name").await.unwrap(), json!("Azure Interior"));

    let country = companies.related("country_id").await.unwrap();
    assert_eq!(country.value("code").await.unwrap(), json!("BE"));

    let tags = companies.related("category_id").await.unwrap();
    assert_eq!(tags.ids(), &[1, 3]);
    assert_eq!(
        tags.name_get().await.unwrap(),
        vec![(1, "Customer".to_string()), (3, "VIP".to_string())]
    );

    system.shutdown().await.expect("Failed to shut down");
}

#[tokio::test]
async fn test_missing_record_is_reported() {
    let system = DemoSystem::new();
    let partner = system.env.model("res.partner").unwrap();

    let err = partner.browse(vec![3, 42, 41]).await.unwrap_err();
    match err {
        ProxyError::RecordNotFound { model, ids } => {
            assert_eq!(model, "res.partner");
            assert_eq!(ids, vec![41, 42]);
        }
        other => panic!("unexpected error: {other}"),
    }

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_staged_link_is_saved_on_server() {
    let system = DemoSystem::new();
    let partner = system.env.model("res.partner").unwrap();

    let deco = partner.browse(2).await.unwrap();
    let tags = deco.related("category_id").await.unwrap();
    assert_eq!(tags.ids(), &[1]);

    tags.add_and_stage([2, 3]).unwrap();
    let commands = tags.remove_and_stage(2).unwrap();
    assert_eq!(commands.commands(), &[Command::Link(3), Command::Unlink(2)]);

    deco.save().await.unwrap();
    assert!(deco.pending_values().is_empty());
    assert_eq!(deco.value("category_id").await.unwrap(), json!([1, 3]));

    // A fresh browse sees the server state.
    let again = partner.browse(2).await.unwrap();
    assert_eq!(again.related("category_id").await.unwrap().ids(), &[1, 3]);

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_virtual_record_save_creates() {
    let system = DemoSystem::new();
    let partner = system.env.model("res.partner").unwrap();

    let draft = partner.browse(()).await.unwrap();
    assert_eq!(draft.value("is_company").await.unwrap(), json!(false));
    draft.stage("name", "Gemini Furniture").unwrap();

    let created = draft.save().await.unwrap();
    assert_eq!(created.id(), Some(4));
    assert_eq!(created.value("name").await.unwrap(), json!("Gemini Furniture"));
    assert_eq!(partner.search_count(json!([])).await.unwrap(), 4);

    assert!(created.unlink().await.unwrap());
    assert_eq!(partner.search_count(json!([])).await.unwrap(), 3);

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_context_travels_with_calls() {
    let system = DemoSystem::new();
    let partner = system.env.model("res.partner").unwrap();
    assert_eq!(partner.env().lang(), Some("en_US"));

    let french = partner.with_context([("lang", "fr_FR")]);
    assert_eq!(french.env().lang(), Some("fr_FR"));
    assert_eq!(french.env().tz(), Some("Europe/Brussels"));

    let base = context_from([("active_test", false)]);
    let bare = partner.with_context_from(base, [("tz", "UTC")]);
    assert_eq!(bare.env().lang(), None);

    let found = french.name_search("deco").await.unwrap();
    assert_eq!(found, vec![(2, "Deco Addict".to_string())]);

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_server_faults_surface_unchanged() {
    let system = DemoSystem::new();
    let partner = system.env.model("res.partner").unwrap();
    let azure = partner.browse(1).await.unwrap();

    let err = azure.call("action_archive").unwrap().send().await.unwrap_err();
    assert!(matches!(
        err,
        ProxyError::Remote(RemoteFault::MissingMethod { ref method, .. })
            if method == "action_archive"
    ));

    let ghost = partner
        .call("write")
        .unwrap()
        .arg(json!([99]))
        .arg(json!({"name": "x"}))
        .send()
        .await;
    assert!(matches!(ghost, Err(ProxyError::Remote(RemoteFault::Validation(_)))));

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_calls_after_shutdown_fail_with_transport() {
    let system = DemoSystem::new();
    let partner = system.env.model("res.partner").unwrap();
    system.shutdown().await.unwrap();

    let err = partner.search(json!([])).await.unwrap_err();
    assert!(matches!(err, ProxyError::Remote(RemoteFault::Transport(_))));
}
