//! # Web3 Bridge Provider Benchmarks
//!
//! | Area | Operation | Target |
//! |------|-----------|--------|
//! | Id mapping | intify + pop one request | < 1µs |
//! | Router | classify one request | < 1µs (non typed-data) |
//! | EIP-712 | hash the Mail example | < 100µs |
//! | Provider | local request round trip | < 10µs |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Value};
use std::sync::Arc;
use wb_provider::domain::id_mapping::{IdMapper, IdSequence};
use wb_provider::domain::typed_data::{eip712_hash, TypedData};
use wb_provider::ports::Eip712Hasher;
use wb_provider::router::{self, ProviderState};
use wb_provider::{ChannelSink, Provider, ProviderConfig, RpcRequest, TypedDataVersion};

const ACCOUNT: &str = "0xABCDEFabcdef0123456789abcdef0123456789AB";

fn mail_typed_data() -> Value {
    json!({
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
    })
}

// ============================================================================
// Id mapping
// ============================================================================

fn bench_id_mapping(c: &mut Criterion) {
    let mut group = c.benchmark_group("id-mapping");
    let mapper = IdMapper::new(Arc::new(IdSequence::starting_at(1)));

    group.bench_function("intify_pop_string_id", |b| {
        b.iter(|| {
            let mut request = RpcRequest::new("eth_blockNumber", json!([])).with_id("page-id");
            let id = mapper.try_intify_id(&mut request);
            black_box(mapper.try_pop_id(id))
        })
    });

    group.bench_function("intify_pop_integer_id", |b| {
        b.iter(|| {
            let mut request = RpcRequest::new("eth_blockNumber", json!([])).with_id(42);
            let id = mapper.try_intify_id(&mut request);
            black_box(mapper.try_pop_id(id))
        })
    });

    for outstanding in [100usize, 1_000, 10_000] {
        let mapper = IdMapper::new(Arc::new(IdSequence::starting_at(1)));
        for _ in 0..outstanding {
            let mut request = RpcRequest::new("eth_call", json!([])).with_id("held");
            mapper.try_intify_id(&mut request);
        }

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("intify_pop_with_outstanding", outstanding),
            &mapper,
            |b, mapper| {
                b.iter(|| {
                    let mut request = RpcRequest::new("eth_call", json!([])).with_id("next");
                    let id = mapper.try_intify_id(&mut request);
                    black_box(mapper.try_pop_id(id))
                })
            },
        );
    }

    group.finish();
}

// ============================================================================
// Router
// ============================================================================

fn bench_routing(c: &mut Criterion) {
    let mut group = c.benchmark_group("router");
    let state = ProviderState::new(ACCOUNT, 1);

    let requests = [
        ("eth_chainId", RpcRequest::new("eth_chainId", json!([]))),
        ("eth_accounts", RpcRequest::new("eth_accounts", json!([]))),
        (
            "personal_sign",
            RpcRequest::new("personal_sign", json!(["0x68656c6c6f", ACCOUNT])),
        ),
        ("eth_sign", RpcRequest::new("eth_sign", json!([ACCOUNT, "hello world"]))),
        (
            "eth_getBalance",
            RpcRequest::new("eth_getBalance", json!([ACCOUNT, "latest"])),
        ),
        (
            "eth_signTypedData_v4",
            RpcRequest::new(
                "eth_signTypedData_v4",
                json!([ACCOUNT, mail_typed_data().to_string()]),
            ),
        ),
    ];

    for (name, request) in requests.iter() {
        group.bench_with_input(BenchmarkId::new("route", name), request, |b, request| {
            b.iter(|| black_box(router::route(request, &state, &Eip712Hasher)))
        });
    }

    group.finish();
}

// ============================================================================
// EIP-712
// ============================================================================

fn bench_typed_data(c: &mut Criterion) {
    let mut group = c.benchmark_group("eip712");
    let raw = mail_typed_data();
    let data = TypedData::from_param(&raw).expect("valid typed data");

    group.bench_function("hash_mail_v4", |b| {
        b.iter(|| black_box(eip712_hash(&data, TypedDataVersion::V4)))
    });

    group.bench_function("parse_and_hash_mail_v4", |b| {
        let text = Value::String(raw.to_string());
        b.iter(|| {
            let data = TypedData::from_param(&text).expect("valid typed data");
            black_box(eip712_hash(&data, TypedDataVersion::V4))
        })
    });

    group.finish();
}

// ============================================================================
// Provider
// ============================================================================

fn bench_local_request(c: &mut Criterion) {
    let mut group = c.benchmark_group("provider");
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");

    let (sink, _rx) = ChannelSink::new();
    let provider = Provider::new(
        ProviderConfig::new(ACCOUNT, 1, "http://127.0.0.1:8545"),
        Arc::new(sink),
    )
    .expect("valid config");

    group.bench_function("eth_chainId", |b| {
        b.iter(|| {
            let request = RpcRequest::new("eth_chainId", json!([])).with_id("c");
            black_box(rt.block_on(provider.request(request)))
        })
    });

    group.bench_function("eth_accounts_sync", |b| {
        b.iter(|| {
            let request = RpcRequest::new("eth_accounts", json!([])).with_id(1);
            black_box(provider.send(request))
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_id_mapping,
    bench_routing,
    bench_typed_data,
    bench_local_request
);
criterion_main!(benches);
