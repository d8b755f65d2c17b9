//! # Pairwise-Agent Benchmarks
//!
//! | Area | Operation |
//! |------|-----------|
//! | shared-crypto | pack / unpack of a request-sized message |
//! | shared-crypto | Ed25519 sign / verify of a `connection~sig` input |
//! | ag-01 | gateway round trip through a wallet worker |
//! | ag-02 | full four-message handshake over the in-memory bus |

use std::time::Duration;

use agent_runtime::{AgentConfig, AgentRuntime};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use shared_crypto::{pack, unpack, Ed25519KeyPair};
use shared_types::WalletHandle;

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(1);

fn bench_pack_unpack(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared-crypto-pack");
    let sender = Ed25519KeyPair::generate();
    let recipient = Ed25519KeyPair::generate();
    let recipient_key = recipient.public_key();

    for size in [256usize, 1024, 8192] {
        let message = vec![0x42u8; size];
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("pack", size), &message, |b, message| {
            b.iter(|| pack(black_box(message), &sender, &recipient_key).unwrap())
        });

        let envelope = pack(&message, &sender, &recipient_key).unwrap();
        group.bench_with_input(BenchmarkId::new("unpack", size), &envelope, |b, envelope| {
            b.iter(|| unpack(black_box(envelope), &recipient).unwrap())
        });
    }
    group.finish();
}

fn bench_sign_verify(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared-crypto-signatures");
    let keypair = Ed25519KeyPair::generate();
    let input = vec![7u8; 600];
    let signature = keypair.sign(&input);
    let public = keypair.public_key();

    group.bench_function("sign", |b| b.iter(|| keypair.sign(black_box(&input))));
    group.bench_function("verify", |b| {
        b.iter(|| public.verify(black_box(&input), &signature).unwrap())
    });
    group.finish();
}

fn bench_gateway_round_trip(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let runtime = AgentRuntime::new(AgentConfig::default());
    let gateway = runtime.gateway();
    let handle = WalletHandle::new("bench", "pass");
    let verkey = rt.block_on(async {
        gateway.create(&handle).await.unwrap();
        gateway
            .create_and_store_my_did(&handle, None)
            .await
            .unwrap()
            .verkey
    });

    let mut group = c.benchmark_group("ag-01-gateway");
    group.bench_function("sign", |b| {
        b.to_async(&rt)
            .iter(|| async { gateway.sign(&handle, &verkey, b"payload").await.unwrap() })
    });
    group.finish();
}

fn bench_full_handshake(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let runtime = AgentRuntime::new(AgentConfig::default());
    let inviter_wallet = WalletHandle::new("inviter", "pass");
    let invitee_wallet = WalletHandle::new("invitee", "pass");
    let (inviter, invitee) = rt.block_on(async {
        let gateway = runtime.gateway();
        gateway.create(&inviter_wallet).await.unwrap();
        gateway.create(&invitee_wallet).await.unwrap();
        (
            runtime.agent("Inviter", "inviter-chan").await.unwrap(),
            runtime.agent("Invitee", "invitee-chan").await.unwrap(),
        )
    });

    let mut group = c.benchmark_group("ag-02-handshake");
    group.measurement_time(Duration::from_secs(10));
    group.bench_function("four-message exchange", |b| {
        b.to_async(&rt).iter(|| async {
            let (link, _) = inviter.generate_invite_link(&inviter_wallet).await.unwrap();
            invitee
                .receive_invite_link(&link, &invitee_wallet)
                .await
                .unwrap();
            for (agent, wallet) in [
                (&inviter, &inviter_wallet),
                (&invitee, &invitee_wallet),
                (&inviter, &inviter_wallet),
            ] {
                runtime
                    .deliver_next(agent, wallet, DELIVERY_TIMEOUT)
                    .await
                    .unwrap()
                    .unwrap();
            }
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_pack_unpack,
    bench_sign_verify,
    bench_gateway_round_trip,
    bench_full_handshake
);
criterion_main!(benches);
