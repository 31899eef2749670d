// ABOUTME: Benchmark suite for the SMS codecs
// ABOUTME: Measures GSM 7-bit packing, TPDU encode/decode and the nested CP/RP/TP envelope

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sms::cpdu::{Cpdu, TransactionId};
use sms::datatypes::{
    Address, DataCoding, InformationElement, Timestamp, UserData, ValidityPeriod, gsm7,
};
use sms::rpdu::{RpData, Rpdu};
use sms::tpdu::{Deliver, Direction, Submit, Tpdu};
use sms::{Decodable, Encodable};
use std::time::Duration;

fn create_sample_submit(text: &str) -> Tpdu {
    Submit::new(
        1,
        Address::international("447700900123").unwrap(),
        UserData::new(text),
    )
    .validity_period(ValidityPeriod::Relative(167))
    .into()
}

fn create_sample_deliver() -> Tpdu {
    let user_data = UserData::new("Hello World").with_element(InformationElement::ConcatenatedSm {
        reference: 7,
        max: 2,
        seq: 1,
    });
    Deliver::new(
        Address::alphanumeric("Bank").unwrap(),
        Timestamp::from_unix(1_300_771_540, 4),
        user_data,
    )
    .data_coding(DataCoding::ucs2())
    .into()
}

fn create_sample_envelope() -> Cpdu {
    let rpdu = Rpdu::from(RpData::new(
        1,
        Address::international("447785016005").unwrap(),
        create_sample_submit("Hello World"),
    ));
    Cpdu::data(TransactionId::new(false, 0).unwrap(), &rpdu).unwrap()
}

fn bench_gsm7(c: &mut Criterion) {
    let mut group = c.benchmark_group("gsm7");
    group.measurement_time(Duration::from_secs(10));

    let text = "The quick brown fox jumps over the lazy dog {}[]€".repeat(3);
    group.bench_function("pack", |b| b.iter(|| gsm7::pack(black_box(&text), 0).unwrap()));

    let packed = gsm7::pack(&text, 0).unwrap();
    let units = gsm7::unit_count(&text).unwrap();
    group.bench_function("unpack", |b| {
        b.iter(|| gsm7::unpack(black_box(&packed), 0, units).unwrap())
    });

    group.finish();
}

fn bench_tpdu(c: &mut Criterion) {
    let mut group = c.benchmark_group("tpdu");
    group.measurement_time(Duration::from_secs(10));

    let submit = create_sample_submit("Hello World");
    group.bench_function("submit_encode", |b| b.iter(|| black_box(&submit).to_bytes()));

    let submit_bytes = submit.to_bytes().unwrap();
    group.bench_function("submit_decode", |b| {
        b.iter(|| Tpdu::from_bytes(Direction::MsToSc, black_box(&submit_bytes)).unwrap())
    });

    let deliver = create_sample_deliver();
    group.bench_function("deliver_encode", |b| b.iter(|| black_box(&deliver).to_bytes()));

    let deliver_bytes = deliver.to_bytes().unwrap();
    group.bench_function("deliver_decode", |b| {
        b.iter(|| Tpdu::from_bytes(Direction::ScToMs, black_box(&deliver_bytes)).unwrap())
    });

    group.finish();
}

fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope");
    group.measurement_time(Duration::from_secs(10));

    let cpdu = create_sample_envelope();
    group.bench_function("encode", |b| b.iter(|| black_box(&cpdu).to_bytes()));

    let bytes = cpdu.to_bytes().unwrap();
    group.bench_function("decode_all_layers", |b| {
        b.iter(|| {
            let Cpdu::Data { payload, .. } = Cpdu::from_bytes(black_box(&bytes)).unwrap() else {
                unreachable!()
            };
            Rpdu::from_bytes(&payload).unwrap()
        })
    });

    group.finish();
}

fn bench_message_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("message_sizes");
    group.measurement_time(Duration::from_secs(10));

    let message_sizes = [10, 50, 100, 160]; // Common SMS message sizes

    for &size in &message_sizes {
        let submit = create_sample_submit(&"A".repeat(size));
        let bytes = submit.to_bytes().unwrap();

        group.bench_with_input(
            BenchmarkId::new("submit_decode", size),
            &bytes,
            |b, bytes| b.iter(|| Tpdu::from_bytes(Direction::MsToSc, black_box(bytes)).unwrap()),
        );

        group.bench_with_input(
            BenchmarkId::new("submit_encode", size),
            &submit,
            |b, submit| b.iter(|| black_box(submit).to_bytes()),
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_gsm7,
    bench_tpdu,
    bench_envelope,
    bench_message_sizes
);
criterion_main!(benches);
