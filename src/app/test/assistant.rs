#[cfg(test)]
mod assistant_integration_tests {
    use crate::{
        app::test::{TestState, TestStateConfig, API_RESULT, SUMMARY},
        core::{
            llm::{Role, Verb},
            swagger::tests::PETSTORE_V2,
        },
        error::{DocAssistErr, DocAssistError},
    };

    #[tokio::test]
    async fn answers_with_retrieved_api() {
        let state = TestState::init(TestStateConfig::new("__assistant_ask_test__")).await;

        state
            .upload("petstore-v2.json", PETSTORE_V2, Some("secret"))
            .await
            .unwrap();

        let info = state
            .app
            .services
            .assistant
            .ask_api("Which pets are in the store?")
            .await
            .unwrap();

        assert_eq!(SUMMARY, info.final_result);
        assert_eq!("GET https://petstore.swagger.io/v2/pets", info.request);
        assert_eq!(200, info.response.code);
        assert_eq!(API_RESULT, info.response.result);
        assert_eq!(20, info.prompt_tokens);
        assert_eq!(10, info.completion_tokens);
        assert_eq!(30, info.total_tokens);

        let document = info.swagger_document.unwrap();
        assert_eq!("petstore-v2.json", document.swagger_file);

        let executed = state.executor.calls.lock().unwrap().clone();
        assert_eq!(1, executed.len());
        assert_eq!(Verb::Get, executed[0].0.verb);
        assert_eq!(Some("secret"), executed[0].1.as_deref());

        let calls = state.chat.calls.lock().unwrap().clone();
        assert_eq!(2, calls.len());

        let generation = &calls[0];
        assert_eq!(Role::System, generation[0].role);
        assert!(generation[0].content.contains(&document.swagger_content));
        assert_eq!("Which pets are in the store?", generation[1].content);

        let summary = &calls[1][0];
        assert_eq!(Role::User, summary.role);
        assert!(summary.content.contains("Which pets are in the store?"));
        assert!(summary.content.contains(API_RESULT));

        state.teardown().await;
    }

    #[tokio::test]
    async fn answers_with_given_api() {
        let state = TestState::init(TestStateConfig::new("__assistant_ask_with_test__")).await;

        let info = state
            .app
            .services
            .assistant
            .ask_api_with(PETSTORE_V2, "List the pets")
            .await
            .unwrap();

        assert!(info.swagger_document.is_none());
        assert_eq!(SUMMARY, info.final_result);

        let executed = state.executor.calls.lock().unwrap().clone();
        assert_eq!(None, executed[0].1);

        state.teardown().await;
    }

    #[tokio::test]
    async fn nothing_to_answer_with() {
        let state = TestState::init(TestStateConfig::new("__assistant_empty_test__")).await;

        let result = state.app.services.assistant.ask_api("List the pets").await;

        assert!(matches!(
            result,
            Err(DocAssistError {
                error: DocAssistErr::NoResults(_),
                ..
            })
        ));
        assert!(state.chat.calls.lock().unwrap().is_empty());

        state.teardown().await;
    }

    #[tokio::test]
    async fn unusable_model_output() {
        let mut config = TestStateConfig::new("__assistant_invalid_test__");
        config.generated_request = "I cannot help with that.".to_string();
        let state = TestState::init(config).await;

        state
            .upload("petstore-v2.json", PETSTORE_V2, None)
            .await
            .unwrap();

        let result = state.app.services.assistant.ask_api("List the pets").await;

        assert!(matches!(
            result,
            Err(DocAssistError {
                error: DocAssistErr::InvalidRequest(_),
                ..
            })
        ));
        assert!(state.executor.calls.lock().unwrap().is_empty());

        state.teardown().await;
    }
}
