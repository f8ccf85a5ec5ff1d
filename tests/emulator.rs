use anyhow::Context;
use futures::StreamExt;
use hrm_emulator::api::CharPropFlags;
use hrm_emulator::config::{DeviceInformation, EmulatorConfig};
use hrm_emulator::emulator::{simulation::Deltas, PeripheralEmulator};
use hrm_emulator::gatt::profile;
use hrm_emulator::loopback::{LoopbackAdapter, LoopbackStack};
use hrm_emulator::Error;
use std::time::Duration;

type Emulator = PeripheralEmulator<LoopbackAdapter, LoopbackStack>;

fn emulator(config: EmulatorConfig) -> anyhow::Result<(Emulator, LoopbackStack)> {
    let stack = LoopbackStack::default();
    let emulator = PeripheralEmulator::new(config, LoopbackAdapter::default(), stack.clone())?;
    Ok((emulator, stack))
}

fn heart_rate(delta: i32) -> Deltas {
    Deltas {
        heart_rate: delta,
        ..Default::default()
    }
}

#[tokio::test]
async fn ticks_notify_only_while_subscribed() -> anyhow::Result<()> {
    let (mut emulator, stack) = emulator(EmulatorConfig::default())?;
    emulator.build_topology();
    let id = emulator
        .heart_rate_characteristic()
        .cloned()
        .context("topology has no heart rate characteristic")?;

    for _ in 0..3 {
        emulator.tick_with(heart_rate(1)).await;
    }
    assert!(stack.notifications_sent().is_empty());
    // The value still tracks the simulation while nobody listens.
    assert_eq!(emulator.on_read(&id)?, vec![0x00, 75]);

    emulator.on_start_notify(&id)?;
    emulator.tick_with(heart_rate(1)).await;
    emulator.tick_with(heart_rate(1)).await;
    assert_eq!(stack.notifications_sent().len(), 2);

    emulator.on_stop_notify(&id)?;
    emulator.tick_with(heart_rate(1)).await;
    assert_eq!(stack.notifications_sent().len(), 2);
    Ok(())
}

#[tokio::test]
async fn tick_publishes_heart_rate_measurement() -> anyhow::Result<()> {
    let (mut emulator, stack) = emulator(EmulatorConfig::default())?;
    emulator.build_topology();
    let id = emulator.heart_rate_characteristic().cloned().unwrap();
    emulator.on_start_notify(&id)?;

    assert_eq!(emulator.state().heart_rate, 72);
    emulator.tick_with(heart_rate(5)).await;

    assert_eq!(emulator.state().heart_rate, 77);
    assert_eq!(emulator.on_read(&id)?, vec![0x00, 77]);
    let sent = stack.notifications_sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].value, vec![0x00, 77]);
    assert_eq!(sent[0].uuid, profile::HEART_RATE_MEASUREMENT);
    assert_eq!(
        sent[0].characteristic.as_str(),
        "/org/bluez/example/service1/char1"
    );
    Ok(())
}

#[tokio::test]
async fn heart_rate_is_clamped_at_the_upper_bound() -> anyhow::Result<()> {
    let (mut emulator, _stack) = emulator(EmulatorConfig::default())?;
    emulator.build_topology();
    emulator.state_mut().heart_rate = 118;
    emulator.tick_with(heart_rate(5)).await;
    assert_eq!(emulator.state().heart_rate, 120);

    let id = emulator.heart_rate_characteristic().cloned().unwrap();
    assert_eq!(emulator.on_read(&id)?, vec![0x00, 120]);
    Ok(())
}

#[tokio::test]
async fn seeded_random_ticks_stay_in_range() -> anyhow::Result<()> {
    let config = EmulatorConfig {
        seed: Some(42),
        ..Default::default()
    };
    let (mut emulator, stack) = emulator(config)?;
    emulator.build_topology();
    let id = emulator.heart_rate_characteristic().cloned().unwrap();
    emulator.on_start_notify(&id)?;

    for _ in 0..500 {
        emulator.tick().await;
        let state = emulator.state();
        assert!((60..=120).contains(&state.heart_rate));
        assert!((95.0..=99.0).contains(&state.spo2));
        assert!((30..=80).contains(&state.stress));
    }

    let sent = stack.notifications_sent();
    assert_eq!(sent.len(), 500);
    assert!(sent
        .iter()
        .all(|n| n.value.len() == 2 && n.value[0] == 0x00 && (60..=120).contains(&n.value[1])));
    Ok(())
}

#[tokio::test]
async fn same_seed_gives_same_walk() -> anyhow::Result<()> {
    let config = EmulatorConfig {
        seed: Some(3),
        ..Default::default()
    };
    let (mut first, _) = emulator(config.clone())?;
    let (mut second, _) = emulator(config)?;
    for _ in 0..50 {
        first.tick().await;
        second.tick().await;
        assert_eq!(first.state(), second.state());
    }
    Ok(())
}

#[test]
fn central_cannot_write_heart_rate_measurement() -> anyhow::Result<()> {
    let (mut emulator, _stack) = emulator(EmulatorConfig::default())?;
    emulator.build_topology();
    let id = emulator.heart_rate_characteristic().cloned().unwrap();

    let result = emulator.on_write(&id, &[0x01]);
    assert!(matches!(result, Err(Error::InvalidAccess { .. })));
    assert_eq!(emulator.on_read(&id)?, vec![0x00]);
    Ok(())
}

#[test]
fn unknown_characteristic_is_reported() -> anyhow::Result<()> {
    let (mut elsewhere, _) = emulator(EmulatorConfig {
        base_path: "/com/example/other".into(),
        ..Default::default()
    })?;
    elsewhere.build_topology();
    let foreign = elsewhere.heart_rate_characteristic().cloned().unwrap();

    let (mut emulator, _) = emulator(EmulatorConfig::default())?;
    emulator.build_topology();
    assert!(matches!(
        emulator.on_read(&foreign),
        Err(Error::CharacteristicNotFound(_))
    ));
    Ok(())
}

#[test]
fn device_information_is_published_when_configured() -> anyhow::Result<()> {
    let config = EmulatorConfig {
        device_information: Some(DeviceInformation {
            manufacturer: "Acme Wearables".into(),
        }),
        ..Default::default()
    };
    let (mut emulator, _stack) = emulator(config)?;
    let heart_rate_service = emulator.build_topology();
    assert_eq!(emulator.build_topology(), heart_rate_service);

    let description = emulator.describe();
    assert_eq!(description.services.len(), 2);
    assert_eq!(description.services[0].uuid, profile::HEART_RATE_SERVICE);
    assert_eq!(
        description.services[1].uuid,
        profile::DEVICE_INFORMATION_SERVICE
    );

    let manufacturer = &description.characteristics[1];
    assert_eq!(manufacturer.uuid, profile::MANUFACTURER_NAME_STRING);
    assert_eq!(manufacturer.flags, CharPropFlags::READ);
    assert_eq!(manufacturer.id.as_str(), "/org/bluez/example/service2/char1");
    assert_eq!(emulator.on_read(&manufacturer.id)?, b"Acme Wearables".to_vec());
    Ok(())
}

#[tokio::test]
async fn adapter_failures_do_not_stop_the_emulator() -> anyhow::Result<()> {
    let stack = LoopbackStack::default();
    let mut emulator = PeripheralEmulator::new(
        EmulatorConfig::default(),
        LoopbackAdapter::failing(),
        stack.clone(),
    )?;
    emulator.shutdown();
    emulator.run().await?;

    assert_eq!(stack.services().len(), 1);
    assert_eq!(stack.characteristics().len(), 1);
    assert_eq!(
        stack.characteristics()[0].flags,
        CharPropFlags::READ | CharPropFlags::NOTIFY
    );
    assert_eq!(stack.advertised_as(), None);

    assert!(matches!(emulator.run().await, Err(Error::Other(_))));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn central_subscribes_and_receives_notifications() -> anyhow::Result<()> {
    let adapter = LoopbackAdapter::default();
    let stack = LoopbackStack::default();
    let mut emulator =
        PeripheralEmulator::new(EmulatorConfig::default(), adapter.clone(), stack.clone())?;
    emulator.build_topology();
    let id = emulator.heart_rate_characteristic().cloned().unwrap();
    let central = emulator.request_sender();
    let shutdown = emulator.shutdown_handle();
    let mut notifications = stack.notifications();

    let running = tokio::spawn(async move { emulator.run().await });

    central.start_notify(id.clone()).await?;
    assert_eq!(stack.advertised_as().as_deref(), Some("Flutter Health Tracker"));
    assert!(adapter.is_powered());
    assert!(adapter.is_discoverable());
    assert_eq!(adapter.alias().as_deref(), Some("Flutter Health Tracker"));

    let first = tokio::time::timeout(Duration::from_secs(5), notifications.next())
        .await?
        .context("notification stream ended")?;
    assert_eq!(first.characteristic, id);
    assert_eq!(first.value[0], 0x00);
    assert!((60..=120).contains(&first.value[1]));
    assert_eq!(central.read(id.clone()).await?, first.value);

    assert!(matches!(
        central.write(id.clone(), vec![1]).await,
        Err(Error::InvalidAccess { .. })
    ));

    central.stop_notify(id.clone()).await?;
    shutdown.shutdown();
    running.await??;

    assert_eq!(stack.advertised_as(), None);
    assert!(matches!(
        central.read(id).await,
        Err(Error::EmulatorStopped)
    ));
    Ok(())
}

#[tokio::test]
async fn walks_at_the_integer_limit_keep_ticking() -> anyhow::Result<()> {
    let config = EmulatorConfig::from_toml(
        r#"
        seed = 1

        [simulation.stress]
        initial = 2147483647
        min = 0
        max = 2147483647
        step_down = 0
        step_up = 5
        "#,
    )?;
    let (mut emulator, _stack) = emulator(config)?;
    emulator.build_topology();
    for _ in 0..20 {
        emulator.tick().await;
    }
    assert_eq!(emulator.state().stress, i32::MAX);
    Ok(())
}
