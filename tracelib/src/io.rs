use std::fs::File;
use std::ops::Deref;

/// Gets the contents of a trace file as bytes, ready for [`crate::trace::replay`]
pub fn map_trace(file: File) -> Result<impl Deref<Target = [u8]>, String> {
    // Compatibility on other systems
    #[cfg(not(unix))]
    {
        use std::io::Read;
        let mut file = file;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(|e| format!("Couldn't read the trace file: {e}"))?;
        Ok(bytes)
    }
    // Memory map the file on unix systems, replay reads it front to back exactly once
    #[cfg(unix)]
    {
        use memmap2::{Advice, Mmap};
        // SAFETY: the map is read only, and trace files aren't expected to change while replaying
        unsafe {
            let m = Mmap::map(&file).map_err(|e| format!("Couldn't memory map the file: {e}"))?;
            m.advise(Advice::Sequential).map_err(|e| format!("Failed to provide access advice to the OS, {e}"))?;
            Ok(m)
        }
    }
}
