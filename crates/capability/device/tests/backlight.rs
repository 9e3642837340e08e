use climlog_device::{Backlight, DeviceError, DigitalOutput};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct RecordingOutput(Arc<Mutex<Vec<bool>>>);

impl DigitalOutput for RecordingOutput {
    fn write(&mut self, high: bool) -> Result<(), DeviceError> {
        self.0.lock().map_err(|_| DeviceError::Lock)?.push(high);
        Ok(())
    }
}

#[test]
fn toggle_flips_and_writes_pin() {
    let output = RecordingOutput::default();
    let backlight = Backlight::new(Box::new(output.clone()));

    assert!(!backlight.is_on());
    assert!(backlight.toggle().expect("toggle"));
    assert!(!backlight.toggle().expect("toggle"));
    backlight.set(true).expect("set");

    assert!(backlight.is_on());
    assert_eq!(*output.0.lock().expect("lock"), vec![true, false, true]);
}

#[test]
fn concurrent_toggles_are_serialized() {
    let output = RecordingOutput::default();
    let backlight = Arc::new(Backlight::new(Box::new(output.clone())));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let backlight = Arc::clone(&backlight);
            std::thread::spawn(move || {
                for _ in 0..250 {
                    backlight.toggle().expect("toggle");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("join");
    }

    // 偶数次翻转后回到初始状态，且每次写入都与前一次相反。
    assert!(!backlight.is_on());
    let writes = output.0.lock().expect("lock");
    assert_eq!(writes.len(), 1000);
    assert!(writes.windows(2).all(|pair| pair[0] != pair[1]));
}
