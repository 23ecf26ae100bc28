//! Performance benchmarks for sigil-chain payload encoding.
//!
//! Covers the per-request hot path of the encoder and verifier:
//! - Cosmos direct-sign payloads (`TxBody` + `AuthInfo` + `SignDoc` digest)
//! - EVM envelopes for each transaction kind
//! - EIP-712 signing hash
//! - bech32 address conversion

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use alloy_primitives::{address, Bytes, U256};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sigil_chain::{cosmos, evm, to_raw_hex, to_textual, typed_data};
use sigil_core::types::{
    AccessListItem, Coin, CosmosFee, DirectCosmosTx, EvmTransaction, EvmTxKind, TypedData,
};

const PUBKEY: [u8; 33] = [
    0x02, 0x79, 0xbe, 0x66, 0x7e, 0xf9, 0xdc, 0xbb, 0xac, 0x55, 0xa0, 0x62, 0x95, 0xce, 0x87,
    0x0b, 0x07, 0x02, 0x9b, 0xfc, 0xdb, 0x2d, 0xce, 0x28, 0xd9, 0x59, 0xf2, 0x81, 0x5b, 0x16,
    0xf8, 0x17, 0x98,
];

fn cosmos_tx(messages: usize) -> DirectCosmosTx {
    let msg = cosmos::msg_send(
        "osmo1w508d6qejxtdg4y5r3zarvary0c5xw7kjxy2e2",
        "osmo1zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3fxyjya",
        &[Coin::new("uosmo", "10000")],
    );
    DirectCosmosTx {
        messages: vec![msg; messages],
        memo: "benchmark".to_string(),
        timeout_height: 0,
        fee: CosmosFee {
            amount: vec![Coin::new("uosmo", "2500")],
            gas_limit: 200_000,
            ..Default::default()
        },
        account_number: 42,
        sequence: 7,
    }
}

fn evm_tx(kind: EvmTxKind, data_len: usize) -> EvmTransaction {
    let fees_1559 = kind == EvmTxKind::Eip1559;
    EvmTransaction {
        kind,
        to: Some(address!("3535353535353535353535353535353535353535")),
        value: U256::from(1_000_000_000_000_000_000u64),
        data: Bytes::from(vec![0xab; data_len]),
        gas_limit: 100_000,
        nonce: 9,
        chain_numeric_id: 9001,
        access_list: (kind == EvmTxKind::Eip2930).then(|| {
            vec![AccessListItem {
                address: address!("de0b295669a9fd93d5f28d9ec85e40f4cb697bae"),
                storage_keys: vec![Default::default(); 2],
            }]
        }),
        max_priority_fee_per_gas: fees_1559.then_some(1_000_000_000),
        max_fee_per_gas: fees_1559.then_some(50_000_000_000),
        gas_price: (!fees_1559).then_some(20_000_000_000),
    }
}

fn benchmark_cosmos_direct(c: &mut Criterion) {
    let mut group = c.benchmark_group("encoding/cosmos_direct");
    for messages in [1usize, 10, 50] {
        let tx = cosmos_tx(messages);
        group.throughput(Throughput::Elements(messages as u64));
        group.bench_with_input(BenchmarkId::from_parameter(messages), &tx, |b, tx| {
            b.iter(|| {
                let payload = cosmos::encode_direct("osmosis-1", black_box(tx), &PUBKEY).unwrap();
                black_box(payload.sign_doc_digest())
            });
        });
    }
    group.finish();
}

fn benchmark_evm_envelopes(c: &mut Criterion) {
    let mut group = c.benchmark_group("encoding/evm");
    for kind in [EvmTxKind::Legacy, EvmTxKind::Eip2930, EvmTxKind::Eip1559] {
        let tx = evm_tx(kind, 68);
        group.bench_with_input(BenchmarkId::from_parameter(kind), &tx, |b, tx| {
            b.iter(|| black_box(evm::signing_hash(black_box(tx)).unwrap()));
        });
    }
    group.finish();
}

fn benchmark_typed_data(c: &mut Criterion) {
    let document: TypedData = serde_json::from_value(serde_json::json!({
        "types": {
            "Person": [
                { "name": "name", "type": "string" },
                { "name": "wallet", "type": "address" }
            ],
            "Mail": [
                { "name": "from", "type": "Person" },
                { "name": "to", "type": "Person" },
                { "name": "contents", "type": "string" }
            ]
        },
        "primaryType": "Mail",
        "domain": { "name": "Ether Mail", "version": "1", "chainId": 1 },
        "message": {
            "from": { "name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826" },
            "to": { "name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB" },
            "contents": "Hello, Bob!"
        }
    }))
    .unwrap();

    c.bench_function("encoding/eip712_signing_hash", |b| {
        b.iter(|| black_box(typed_data::signing_hash(black_box(&document)).unwrap()));
    });
}

fn benchmark_address_codec(c: &mut Criterion) {
    let raw = "0x751e76e8199196d454941c45d1b3a323f1433bd6";
    let textual = to_textual(raw, "cosmos").unwrap();

    c.bench_function("address/to_textual", |b| {
        b.iter(|| black_box(to_textual(black_box(raw), "cosmos").unwrap()));
    });
    c.bench_function("address/to_raw_hex", |b| {
        b.iter(|| black_box(to_raw_hex(black_box(&textual), "cosmos").unwrap()));
    });
}

criterion_group!(
    benches,
    benchmark_cosmos_direct,
    benchmark_evm_envelopes,
    benchmark_typed_data,
    benchmark_address_codec,
);

criterion_main!(benches);
