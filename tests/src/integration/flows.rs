//! # Single-Provider Request Flows
//!
//! Exercises one provider end to end: id remapping, routing, the host
//! message channel, the upstream transport and result shaping.
//!
//! ## Flows Tested:
//!
//! 1. **Local**: `eth_chainId`, `net_version`, `eth_accounts` answered from state
//! 2. **Host**: signing and account methods posted as `{id, name, object}`
//! 3. **Upstream**: everything else forwarded with the internal id
//! 4. **Refused**: filters/subscriptions and pre-login host calls

#[cfg(test)]
mod tests {
    use crate::integration::support::{Fixture, ACCOUNT};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::task::JoinHandle;
    use wb_provider::domain::IdSequence;
    use wb_provider::{
        codes, HostHandler, Provider, ProviderConfig, ProviderDirectory, ProviderResult,
        RpcOutcome, RpcPayload, RpcRequest, TransportError,
    };

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn spawn_request(
        provider: &Provider,
        request: RpcRequest,
    ) -> JoinHandle<ProviderResult<Value>> {
        let provider = provider.clone();
        tokio::spawn(async move { provider.request(request).await })
    }

    fn spawn_send_async(provider: &Provider, payload: RpcPayload) -> JoinHandle<RpcOutcome> {
        let provider = provider.clone();
        tokio::spawn(async move { provider.send_async(payload).await })
    }

    fn lower(address: &str) -> String {
        address.to_lowercase()
    }

    // =============================================================================
    // LOCAL METHODS
    // =============================================================================

    /// Chain id 39 reads back as hex and as a decimal string
    #[tokio::test]
    async fn test_chain_id_and_net_version() {
        let fixture = Fixture::new(ACCOUNT, 39);

        let chain_id = fixture
            .provider
            .request(RpcRequest::new("eth_chainId", json!([])))
            .await;
        assert_eq!(chain_id, Ok(json!("0x27")));

        let version = fixture
            .provider
            .request(RpcRequest::new("net_version", json!([])))
            .await;
        assert_eq!(version, Ok(json!("39")));
    }

    /// Accounts are empty until an address is set, then lowercased
    #[tokio::test]
    async fn test_accounts_follow_address() {
        let fixture = Fixture::new("", 39);

        let before = fixture
            .provider
            .request(RpcRequest::new("eth_accounts", json!([])))
            .await;
        assert_eq!(before, Ok(json!([])));

        fixture.provider.set_address(ACCOUNT).unwrap();

        let after = fixture
            .provider
            .request(RpcRequest::new("eth_accounts", json!([])))
            .await;
        assert_eq!(after, Ok(json!([lower(ACCOUNT)])));

        let coinbase = fixture
            .provider
            .request(RpcRequest::new("eth_coinbase", json!([])))
            .await;
        assert_eq!(coinbase, Ok(json!(lower(ACCOUNT))));
    }

    /// Legacy synchronous send only knows the four local methods
    #[tokio::test]
    async fn test_sync_send() {
        let fixture = Fixture::new(ACCOUNT, 39);

        let response = fixture
            .provider
            .send(RpcRequest::new("eth_accounts", json!([])).with_id(4))
            .unwrap();
        assert_eq!(
            response.into_value(),
            json!({"jsonrpc": "2.0", "id": 4, "result": [lower(ACCOUNT)]})
        );

        let err = fixture
            .provider
            .send(RpcRequest::new("eth_sendTransaction", json!([{}])))
            .unwrap_err();
        assert_eq!(err.code, codes::UNSUPPORTED_METHOD);
        assert!(err
            .message
            .contains("does not support calling eth_sendTransaction synchronously"));
    }

    // =============================================================================
    // HOST METHODS
    // =============================================================================

    /// Two outstanding signatures resolved out of order reach their own callers
    #[tokio::test]
    async fn test_out_of_order_host_results() {
        let mut fixture = Fixture::new(ACCOUNT, 1);

        let first = spawn_request(
            &fixture.provider,
            RpcRequest::new("personal_sign", json!(["0x01", ACCOUNT])).with_id(1),
        );
        let second = spawn_request(
            &fixture.provider,
            RpcRequest::new("personal_sign", json!(["0x02", ACCOUNT])).with_id(2),
        );

        let mut by_payload = HashMap::new();
        for _ in 0..2 {
            let message = fixture.host.next_message().await;
            assert_eq!(message.name, HostHandler::SignPersonalMessage);
            by_payload.insert(message.object["data"].clone(), message.id);
        }
        // integer caller ids go out unchanged
        assert_eq!(by_payload[&json!("0x01")], 1);
        assert_eq!(by_payload[&json!("0x02")], 2);

        fixture.provider.deliver_result(2, json!("0xsig-two"));
        fixture.provider.deliver_result(1, json!("0xsig-one"));

        assert_eq!(first.await.unwrap(), Ok(json!("0xsig-one")));
        assert_eq!(second.await.unwrap(), Ok(json!("0xsig-two")));
        assert_eq!(fixture.provider.pending_count(), 0);
    }

    /// A caller id equal to the next internal id never shares the host id
    #[tokio::test]
    async fn test_caller_id_matching_next_internal_id() {
        let sequence = Arc::new(IdSequence::starting_at(500));
        let directory = Arc::new(ProviderDirectory::with_sequence(Arc::clone(&sequence)));
        let config = ProviderConfig::new(ACCOUNT, 1, "http://upstream.test");
        let mut fixture = Fixture::build(config, Some(directory));

        let integer = spawn_request(
            &fixture.provider,
            RpcRequest::new("personal_sign", json!(["0x01", ACCOUNT])).with_id(500),
        );
        let first = fixture.host.next_message().await;
        let text = spawn_send_async(
            &fixture.provider,
            RpcRequest::new("personal_sign", json!(["0x02", ACCOUNT]))
                .with_id("str")
                .into(),
        );
        let second = fixture.host.next_message().await;

        assert_eq!(first.id, 500);
        assert_ne!(second.id, first.id);
        assert_eq!(fixture.provider.pending_count(), 2);

        // replies in reverse order still reach their own callers
        fixture.provider.deliver_result(second.id, json!("0xsig-str"));
        fixture.provider.deliver_result(first.id, json!("0xsig-500"));

        assert_eq!(integer.await.unwrap(), Ok(json!("0xsig-500")));
        assert_eq!(
            text.await.unwrap(),
            RpcOutcome::Single(Ok(json!({
                "jsonrpc": "2.0",
                "id": "str",
                "result": "0xsig-str"
            })))
        );
        assert_eq!(fixture.provider.stats().dropped, 0);
        assert_eq!(sequence.in_flight(), 0);
    }

    /// The same integer id used twice at once is remapped, then restored
    #[tokio::test]
    async fn test_duplicate_integer_ids_in_flight() {
        let mut fixture = Fixture::new(ACCOUNT, 1);

        let first = spawn_send_async(
            &fixture.provider,
            RpcRequest::new("personal_sign", json!(["0x01", ACCOUNT]))
                .with_id(9)
                .into(),
        );
        let first_message = fixture.host.next_message().await;
        let second = spawn_send_async(
            &fixture.provider,
            RpcRequest::new("personal_sign", json!(["0x02", ACCOUNT]))
                .with_id(9)
                .into(),
        );
        let second_message = fixture.host.next_message().await;
        assert_eq!(first_message.id, 9);
        assert_ne!(second_message.id, 9);

        fixture.provider.deliver_result(second_message.id, json!("0xb"));
        fixture.provider.deliver_result(first_message.id, json!("0xa"));

        assert_eq!(
            first.await.unwrap(),
            RpcOutcome::Single(Ok(json!({"jsonrpc": "2.0", "id": 9, "result": "0xa"})))
        );
        assert_eq!(
            second.await.unwrap(),
            RpcOutcome::Single(Ok(json!({"jsonrpc": "2.0", "id": 9, "result": "0xb"})))
        );
    }

    /// watchAsset without decimals goes out with decimals 0
    #[tokio::test]
    async fn test_watch_asset_default_decimals() {
        let mut fixture = Fixture::new(ACCOUNT, 1);

        let call = spawn_request(
            &fixture.provider,
            RpcRequest::new(
                "wallet_watchAsset",
                json!({
                    "type": "ERC20",
                    "options": {"address": "0xToken", "symbol": "TKN"}
                }),
            ),
        );

        let message = fixture.host.next_message().await;
        assert_eq!(message.name, HostHandler::WatchAsset);
        assert_eq!(
            message.object,
            json!({"type": "ERC20", "contract": "0xToken", "symbol": "TKN", "decimals": 0})
        );

        fixture.provider.deliver_result(message.id, json!(true));
        assert_eq!(call.await.unwrap(), Ok(json!(true)));
    }

    /// Host calls before login fail with 4100 and never reach the host
    #[tokio::test]
    async fn test_readiness_gating() {
        let mut fixture = Fixture::new("", 1);

        for (method, params) in [
            ("personal_sign", json!(["0x00", ACCOUNT])),
            ("eth_sendTransaction", json!([{"to": "0x1"}])),
            ("wallet_addEthereumChain", json!([{"chainId": "0x38"}])),
        ] {
            let err = fixture
                .provider
                .request(RpcRequest::new(method, params))
                .await
                .unwrap_err();
            assert_eq!(err.code, codes::UNAUTHORIZED, "{method}");
        }
        assert!(fixture.host.try_next().is_none());
        assert_eq!(fixture.provider.pending_count(), 0);

        // requestAccounts bootstraps readiness and is always posted
        let call = spawn_request(
            &fixture.provider,
            RpcRequest::new("eth_requestAccounts", json!([])),
        );
        let message = fixture.host.next_message().await;
        assert_eq!(message.name, HostHandler::RequestAccounts);

        // host answers with a JSON-encoded string; the caller gets the array
        fixture
            .provider
            .deliver_result(message.id, json!(format!("[\"{}\"]", lower(ACCOUNT))));
        assert_eq!(call.await.unwrap(), Ok(json!([lower(ACCOUNT)])));
    }

    /// eth_sign picks the handler from the payload bytes
    #[tokio::test]
    async fn test_eth_sign_classification() {
        let mut fixture = Fixture::new(ACCOUNT, 1);

        let _text = spawn_request(
            &fixture.provider,
            RpcRequest::new("eth_sign", json!([ACCOUNT, "hello"])),
        );
        let message = fixture.host.next_message().await;
        assert_eq!(message.name, HostHandler::SignPersonalMessage);
        assert_eq!(message.object, json!({"data": "0x68656c6c6f"}));

        let hash = "0x879a053d4800c6354e76c7985a865d2922c82fb5b3f4577b2fe08b998954f2e0";
        let _binary = spawn_request(
            &fixture.provider,
            RpcRequest::new("eth_sign", json!([ACCOUNT, hash])),
        );
        let message = fixture.host.next_message().await;
        assert_eq!(message.name, HostHandler::SignMessage);
        assert_eq!(message.object, json!({"data": hash}));
    }

    /// personal_ecRecover sends {signature, message}
    #[tokio::test]
    async fn test_ec_recover_payload() {
        let mut fixture = Fixture::new(ACCOUNT, 1);

        let call = spawn_request(
            &fixture.provider,
            RpcRequest::new("personal_ecRecover", json!(["0x68656c6c6f", "0xsig"])),
        );
        let message = fixture.host.next_message().await;
        assert_eq!(message.name, HostHandler::EcRecover);
        assert_eq!(
            message.object,
            json!({"signature": "0xsig", "message": "0x68656c6c6f"})
        );

        fixture.provider.deliver_result(message.id, json!(lower(ACCOUNT)));
        assert_eq!(call.await.unwrap(), Ok(json!(lower(ACCOUNT))));
    }

    /// Typed data is hashed locally; the host gets the digest and the raw JSON
    #[tokio::test]
    async fn test_typed_data_v4_payload() {
        let mut fixture = Fixture::new(ACCOUNT, 1);
        let typed = json!({
            "types": {
                "EIP712Domain": [
                    {"name": "name", "type": "string"},
                    {"name": "version", "type": "string"},
                    {"name": "chainId", "type": "uint256"},
                    {"name": "verifyingContract", "type": "address"}
                ],
                "Person": [
                    {"name": "name", "type": "string"},
                    {"name": "wallet", "type": "address"}
                ],
                "Mail": [
                    {"name": "from", "type": "Person"},
                    {"name": "to", "type": "Person"},
                    {"name": "contents", "type": "string"}
                ]
            },
            "primaryType": "Mail",
            "domain": {
                "name": "Ether Mail",
                "version": "1",
                "chainId": 1,
                "verifyingContract": "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"
            },
            "message": {
                "from": {"name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"},
                "to": {"name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB"},
                "contents": "Hello, Bob!"
            }
        });
        let raw = typed.to_string();

        let _call = spawn_request(
            &fixture.provider,
            RpcRequest::new("eth_signTypedData_v4", json!([ACCOUNT, raw.clone()])),
        );
        let message = fixture.host.next_message().await;
        assert_eq!(message.name, HostHandler::SignTypedMessage);
        assert_eq!(
            message.object["data"],
            "0xbe609aee343fb3c4b28e1df9e632fca64fcfaede20f02e86244efddf30957bd2"
        );
        assert_eq!(message.object["raw"], json!(raw));
    }

    /// Host errors travel the reject path
    #[tokio::test]
    async fn test_host_error_reply() {
        let mut fixture = Fixture::new(ACCOUNT, 1);

        let call = spawn_request(
            &fixture.provider,
            RpcRequest::new("eth_sendTransaction", json!([{"to": "0x1", "value": "0x0"}])),
        );
        let message = fixture.host.next_message().await;
        assert_eq!(message.name, HostHandler::SignTransaction);

        let reply = json!({
            "id": message.id,
            "error": {"code": 4001, "message": "User rejected the request"}
        });
        fixture
            .provider
            .handle_host_message(&reply.to_string())
            .unwrap();

        let err = call.await.unwrap().unwrap_err();
        assert_eq!(err.code, codes::USER_REJECTED);
        assert_eq!(err.message, "User rejected the request");
    }

    /// A second delivery for a settled id has no effect
    #[tokio::test]
    async fn test_idempotent_resolution() {
        let mut fixture = Fixture::new(ACCOUNT, 1);

        let call = spawn_request(
            &fixture.provider,
            RpcRequest::new("personal_sign", json!(["0x00", ACCOUNT])),
        );
        let message = fixture.host.next_message().await;

        fixture.provider.deliver_result(message.id, json!("0xfirst"));
        fixture.provider.deliver_result(message.id, json!("0xsecond"));
        fixture.provider.deliver_error(message.id, json!("too late"));

        assert_eq!(call.await.unwrap(), Ok(json!("0xfirst")));
        let stats = fixture.provider.stats();
        assert_eq!(stats.resolved, 1);
        assert_eq!(stats.rejected, 0);
        assert_eq!(stats.dropped, 2);
    }

    /// sendAsync wraps host results with the caller's original id
    #[tokio::test]
    async fn test_wrapped_host_result_restores_id() {
        let mut fixture = Fixture::new(ACCOUNT, 1);

        let call = spawn_send_async(
            &fixture.provider,
            RpcRequest::new("personal_sign", json!(["0x00", ACCOUNT]))
                .with_id("req-7")
                .into(),
        );
        let message = fixture.host.next_message().await;
        fixture.provider.deliver_result(message.id, json!("0xsig"));

        match call.await.unwrap() {
            RpcOutcome::Single(Ok(envelope)) => assert_eq!(
                envelope,
                json!({"jsonrpc": "2.0", "id": "req-7", "result": "0xsig"})
            ),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    // =============================================================================
    // REFUSED METHODS
    // =============================================================================

    /// Filters and subscriptions fail with 4200 and leave no trace
    #[tokio::test]
    async fn test_unsupported_methods() {
        let mut fixture = Fixture::new(ACCOUNT, 1);

        for method in [
            "eth_newFilter",
            "eth_newBlockFilter",
            "eth_newPendingTransactionFilter",
            "eth_uninstallFilter",
            "eth_subscribe",
        ] {
            let err = fixture
                .provider
                .request(RpcRequest::new(method, json!([])).with_id("x"))
                .await
                .unwrap_err();
            assert_eq!(err.code, codes::UNSUPPORTED_METHOD, "{method}");
        }

        assert_eq!(fixture.provider.stats().registered, 0);
        assert!(fixture.host.try_next().is_none());
        assert!(fixture.upstream.calls().is_empty());
    }

    // =============================================================================
    // UPSTREAM
    // =============================================================================

    /// Upstream sees the internal integer id; the caller gets its own back
    #[tokio::test]
    async fn test_upstream_forwarding() {
        let fixture = Fixture::new(ACCOUNT, 1);
        fixture.upstream.respond("eth_blockNumber", json!("0x10"));

        let bare = fixture
            .provider
            .request(RpcRequest::new("eth_blockNumber", json!([])).with_id("blk"))
            .await;
        assert_eq!(bare, Ok(json!("0x10")));

        let calls = fixture.upstream.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "http://upstream.test");
        assert!(calls[0].1.internal_id().is_some());

        let wrapped = fixture
            .provider
            .send_async(RpcRequest::new("eth_blockNumber", json!([])).with_id("blk").into())
            .await;
        assert_eq!(
            wrapped,
            RpcOutcome::Single(Ok(json!({"jsonrpc": "2.0", "id": "blk", "result": "0x10"})))
        );
    }

    /// Node errors reach the caller verbatim
    #[tokio::test]
    async fn test_upstream_error_verbatim() {
        let fixture = Fixture::new(ACCOUNT, 1);
        fixture.upstream.fail(
            "eth_call",
            TransportError::Rpc {
                code: 3,
                message: "execution reverted".into(),
                data: Some(json!("0x08c379a0")),
            },
        );

        let err = fixture
            .provider
            .request(RpcRequest::new("eth_call", json!([{"to": "0x1"}, "latest"])))
            .await
            .unwrap_err();
        assert_eq!(err.code, 3);
        assert_eq!(err.message, "execution reverted");
        assert_eq!(err.data, Some(json!("0x08c379a0")));
        assert_eq!(fixture.provider.pending_count(), 0);
    }

    /// Batches dispatch concurrently and keep request order
    #[tokio::test]
    async fn test_batch_results_by_position() {
        let fixture = Fixture::new(ACCOUNT, 39);
        fixture.upstream.respond("eth_getBalance", json!("0xde0b6b3a7640000"));

        let outcome = fixture
            .provider
            .send_async(RpcPayload::Batch(vec![
                RpcRequest::new("eth_chainId", json!([])).with_id("a"),
                RpcRequest::new("eth_getBalance", json!([ACCOUNT, "latest"])).with_id("b"),
                RpcRequest::new("eth_subscribe", json!(["newHeads"])).with_id("c"),
            ]))
            .await;

        let RpcOutcome::Batch(results) = outcome else {
            panic!("expected batch outcome");
        };
        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0],
            Ok(json!({"jsonrpc": "2.0", "id": "a", "result": "0x27"}))
        );
        assert_eq!(
            results[1],
            Ok(json!({"jsonrpc": "2.0", "id": "b", "result": "0xde0b6b3a7640000"}))
        );
        assert_eq!(
            results[2].as_ref().unwrap_err().code,
            codes::UNSUPPORTED_METHOD
        );
    }

    // =============================================================================
    // EVENTS
    // =============================================================================

    /// Host events and config changes reach subscribers
    #[tokio::test]
    async fn test_events() {
        let fixture = Fixture::new("", 1);
        let mut events = fixture.provider.subscribe();

        fixture.provider.emit_connect();
        fixture.provider.set_address(ACCOUNT).unwrap();
        fixture.provider.set_chain_id(56).unwrap();
        fixture
            .provider
            .remote_emit("message", json!("{\"type\":\"eth_subscription\"}"));

        let seen: Vec<(String, Value)> = (0..4)
            .map(|_| events.try_recv().unwrap())
            .map(|e| (e.event, e.payload))
            .collect();
        assert_eq!(
            seen,
            vec![
                ("connect".to_string(), json!({"chainId": "0x1"})),
                ("accountsChanged".to_string(), json!([lower(ACCOUNT)])),
                ("chainChanged".to_string(), json!("0x38")),
                ("message".to_string(), json!({"type": "eth_subscription"})),
            ]
        );
    }
}
