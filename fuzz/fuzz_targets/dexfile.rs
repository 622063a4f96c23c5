#![no_main]

use dexir::{DexWriter, File, IrBuilder, WriterConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(file) = File::from_mem(data.to_vec()) else {
        return;
    };
    let Ok(mut header) = IrBuilder::new().build(&file) else {
        return;
    };
    let _ = DexWriter::new(&mut header, WriterConfig::relayout()).write();
});
