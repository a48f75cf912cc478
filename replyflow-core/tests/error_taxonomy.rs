use replyflow_core::{AuthError, FetchError, LlmError, PipelineError, PublishError};

#[test]
fn stage_labels() {
    let disconnected = PipelineError::Disconnected {
        platform: "reddit".to_string(),
    };
    assert_eq!(disconnected.stage(), "token");

    let config = PipelineError::ConfigMissing {
        field: "searchTerm".to_string(),
    };
    assert_eq!(config.stage(), "config");

    let lease = PipelineError::RunInProgress {
        account_id: "acct-1".to_string(),
    };
    assert_eq!(lease.stage(), "lease");

    let fetch = PipelineError::Fetch(FetchError::Api {
        status: 500,
        body: "oops".to_string(),
    });
    assert_eq!(fetch.stage(), "fetch");

    let llm = PipelineError::Llm(LlmError::EmptyResponse);
    assert_eq!(llm.stage(), "generate");
}

#[test]
fn upstream_bodies_survive_into_messages() {
    let publish = PipelineError::Publish(PublishError::Api {
        status: 429,
        body: "spam heuristics tripped".to_string(),
    });
    let message = publish.to_string();
    assert!(message.contains("429"));
    assert!(message.contains("spam heuristics tripped"));
}

#[test]
fn domain_errors_convert_into_pipeline_error() {
    let err: PipelineError = AuthError::MissingRefreshToken.into();
    assert!(matches!(err, PipelineError::Auth(_)));

    let err: PipelineError = LlmError::Api {
        status: 500,
        body: "upstream".to_string(),
    }
    .into();
    assert!(matches!(err, PipelineError::Llm(_)));
}

#[test]
fn disconnected_names_the_platform() {
    let err = PipelineError::Disconnected {
        platform: "twitter".to_string(),
    };
    assert_eq!(err.to_string(), "twitter account is not connected");
}
