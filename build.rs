fn main() {
    // Windows: embed the application icon so Explorer and the taskbar show it
    #[cfg(target_os = "windows")]
    {
        let mut res = winres::WindowsResource::new();
        res.set("FileDescription", "Player13 IPTV Player");
        res.set("ProductName", "Player13");

        if std::path::Path::new("assets/icon.ico").exists() {
            res.set_icon("assets/icon.ico");
        }

        if let Err(e) = res.compile() {
            println!("cargo:warning=Failed to embed icon: {}", e);
        }
    }
}
