//! Integration tests for SCL3300 register access using mocked SPI.

use embedded_hal::spi::ErrorKind;
use embedded_hal_mock::eh1::{
    delay::NoopDelay,
    spi::{Mock as SpiMock, Transaction as SpiTransaction},
};
use scl3300_async::{Command, Error, RunState, Scl3300, frame};

/// Helper to create a response frame with a valid CRC.
fn response_frame(command: Command, run_state: u8, data: u16) -> [u8; 4] {
    let op = command.payload() & 0xFC_0000;
    frame::encode(op | (u32::from(run_state) << 16) | u32::from(data)).to_be_bytes()
}

/// Expectations for one register read: the device answers on the second frame.
fn read_expectations(command: Command, reply: [u8; 4]) -> Vec<SpiTransaction<u8>> {
    let request = command.frame().to_be_bytes().to_vec();
    vec![
        SpiTransaction::transaction_start(),
        SpiTransaction::transfer(request.clone(), vec![0x00, 0x00, 0x00, 0x00]),
        SpiTransaction::transaction_end(),
        SpiTransaction::transaction_start(),
        SpiTransaction::transfer(request, reply.to_vec()),
        SpiTransaction::transaction_end(),
    ]
}

#[tokio::test]
async fn reads_angle_register() {
    let expectations = read_expectations(
        Command::ReadAngX,
        response_frame(Command::ReadAngX, 0b01, 0x071C),
    );

    let spi = SpiMock::new(&expectations);
    let mut sensor = Scl3300::new(spi, NoopDelay::new());

    let response = sensor.read_register(Command::ReadAngX).await.unwrap();
    assert_eq!(response.data(), 0x071C);
    assert_eq!(response.run_state(), RunState::Normal);

    let (mut spi, _) = sensor.release();
    spi.done();
}

#[tokio::test]
async fn sends_documented_read_frame() {
    let expectations = read_expectations(
        Command::ReadWhoAmI,
        response_frame(Command::ReadWhoAmI, 0b01, 0x00C1),
    );

    let spi = SpiMock::new(&expectations);
    let mut sensor = Scl3300::new(spi, NoopDelay::new());

    let response = sensor.read_register(Command::ReadWhoAmI).await.unwrap();
    assert_eq!(response.data(), 0x00C1);

    let (mut spi, _) = sensor.release();
    spi.done();
}

#[tokio::test]
async fn writes_command_frame() {
    let expectations = [
        SpiTransaction::transaction_start(),
        SpiTransaction::transfer(vec![0xB4, 0x00, 0x20, 0x98], vec![0x00, 0x00, 0x00, 0x00]),
        SpiTransaction::transaction_end(),
    ];

    let spi = SpiMock::new(&expectations);
    let mut sensor = Scl3300::new(spi, NoopDelay::new());

    sensor.write_command(Command::SwReset).await.unwrap();

    let (mut spi, _) = sensor.release();
    spi.done();
}

#[tokio::test]
async fn detects_checksum_error() {
    let mut reply = response_frame(Command::ReadAngY, 0b01, 0x1234);
    reply[3] ^= 0x01;

    let expectations = read_expectations(Command::ReadAngY, reply);

    let spi = SpiMock::new(&expectations);
    let mut sensor = Scl3300::new(spi, NoopDelay::new());

    let result = sensor.read_register(Command::ReadAngY).await;
    assert!(matches!(result, Err(Error::Checksum(e)) if e.frame == u32::from_be_bytes(reply)));

    let (mut spi, _) = sensor.release();
    spi.done();
}

#[tokio::test]
async fn reads_signed_data() {
    let expectations = read_expectations(
        Command::ReadAngZ,
        response_frame(Command::ReadAngZ, 0b01, 0xFC72),
    );

    let spi = SpiMock::new(&expectations);
    let mut sensor = Scl3300::new(spi, NoopDelay::new());

    let response = sensor.read_register(Command::ReadAngZ).await.unwrap();
    assert_eq!(response.data_signed(), -910);

    let (mut spi, _) = sensor.release();
    spi.done();
}

#[tokio::test]
async fn reports_run_state_bits() {
    let expectations = read_expectations(
        Command::ReadStatusSummary,
        response_frame(Command::ReadStatusSummary, 0b11, 0x0010),
    );

    let spi = SpiMock::new(&expectations);
    let mut sensor = Scl3300::new(spi, NoopDelay::new());

    let response = sensor
        .read_register(Command::ReadStatusSummary)
        .await
        .unwrap();
    assert_eq!(response.run_state(), RunState::Error);
    assert_eq!(response.data(), 0x0010);

    let (mut spi, _) = sensor.release();
    spi.done();
}

#[tokio::test]
async fn retries_failed_read_when_configured() {
    let mut bad = response_frame(Command::ReadTemperature, 0b01, 0x1600);
    bad[2] ^= 0x40;

    let mut expectations = read_expectations(Command::ReadTemperature, bad);
    expectations.extend(read_expectations(
        Command::ReadTemperature,
        response_frame(Command::ReadTemperature, 0b01, 0x1600),
    ));

    let spi = SpiMock::new(&expectations);
    let config = scl3300_async::Config::default().with_read_retries(1);
    let mut sensor = Scl3300::with_config(spi, NoopDelay::new(), config);

    let response = sensor
        .read_register(Command::ReadTemperature)
        .await
        .unwrap();
    assert_eq!(response.data(), 0x1600);

    let (mut spi, _) = sensor.release();
    spi.done();
}

#[tokio::test]
async fn reads_multiple_registers_sequentially() {
    let values = [0x0000, 0x0B6C, 0x16D8, 0xF494];
    let mut expectations = Vec::new();

    for &value in &values {
        expectations.extend(read_expectations(
            Command::ReadAngX,
            response_frame(Command::ReadAngX, 0b01, value),
        ));
    }

    let spi = SpiMock::new(&expectations);
    let mut sensor = Scl3300::new(spi, NoopDelay::new());

    for &expected in &values {
        let response = sensor.read_register(Command::ReadAngX).await.unwrap();
        assert_eq!(response.data(), expected);
    }

    let (mut spi, _) = sensor.release();
    spi.done();
}

#[test]
fn maps_communication_error_kind() {
    let err: Error<ErrorKind> = Error::Communication(ErrorKind::Overrun);
    assert_eq!(err.kind(), Some(ErrorKind::Overrun));

    let err: Error<ErrorKind> = Error::NoValidSamples;
    assert_eq!(err.kind(), None);
}
