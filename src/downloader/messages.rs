// Static texts for the chat commands

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;

/// Human-readable size limit: `50 MB`, `1.5 MB`, `512 KB`
pub fn format_size(bytes: u64) -> String {
    if bytes >= MIB {
        if bytes % MIB == 0 {
            format!("{} MB", bytes / MIB)
        } else {
            format!("{:.1} MB", bytes as f64 / MIB as f64)
        }
    } else if bytes >= KIB {
        format!("{} KB", bytes / KIB)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Reply to `/start`
pub fn welcome_text() -> &'static str {
    "🎵 Welcome to TikTok Video Downloader Bot! 🎵\n\n\
     I can help you download TikTok videos without watermarks.\n\n\
     📱 Just send me a TikTok video URL and I'll download it for you!\n\n\
     Commands:\n\
     /start - Show this welcome message\n\
     /help - Show help information\n\n\
     ⚠️ Note: Please respect copyright and only download videos you have permission to use."
}

/// Reply to `/help`, quoting the configured size limit
pub fn help_text(max_file_size: u64) -> String {
    format!(
        "📖 How to use TikTok Downloader Bot:\n\n\
         1️⃣ Copy a TikTok video URL from the TikTok app or website\n\
         2️⃣ Send the URL to this bot\n\
         3️⃣ Wait for the bot to process and download the video\n\
         4️⃣ Receive your downloaded video!\n\n\
         🔗 Supported URL formats:\n\
         • https://www.tiktok.com/@username/video/1234567890\n\
         • https://vm.tiktok.com/xxxxx/\n\
         • https://vt.tiktok.com/xxxxx/\n\n\
         ⚠️ Important notes:\n\
         • Maximum file size: {}\n\
         • Only public TikTok videos can be downloaded\n\
         • Respect copyright and fair use policies",
        format_size(max_file_size)
    )
}
