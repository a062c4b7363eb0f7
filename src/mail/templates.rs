//! Inline text and HTML bodies for the three outbound messages.

pub struct MailContent {
    pub subject: String,
    pub text: String,
    pub html: String,
}

pub fn verification(code: &str) -> MailContent {
    MailContent {
        subject: "Verify your email".into(),
        text: format!(
            "Your verification code is {code}. It expires in 15 minutes."
        ),
        html: format!(
            "<html><body>\
             <h2>Verify your email</h2>\
             <p>Enter this code to verify your account:</p>\
             <p style=\"font-size:24px;letter-spacing:4px;\"><strong>{code}</strong></p>\
             <p>The code expires in 15 minutes. If you didn't sign up, ignore this email.</p>\
             </body></html>"
        ),
    }
}

pub fn welcome(first_name: &str) -> MailContent {
    MailContent {
        subject: "Welcome to Notekeep".into(),
        text: format!("Welcome to Notekeep, {first_name}!"),
        html: format!(
            "<html><body>\
             <h2>Welcome, {first_name}!</h2>\
             <p>Your email is verified and your account is ready to use.</p>\
             </body></html>"
        ),
    }
}

pub fn password_reset(code: &str) -> MailContent {
    MailContent {
        subject: "Reset your password".into(),
        text: format!(
            "Your password reset code is {code}. It expires in 15 minutes."
        ),
        html: format!(
            "<html><body>\
             <h2>Reset your password</h2>\
             <p>Enter this code to choose a new password:</p>\
             <p style=\"font-size:24px;letter-spacing:4px;\"><strong>{code}</strong></p>\
             <p>The code expires in 15 minutes. If you didn't request a reset, ignore this email.</p>\
             </body></html>"
        ),
    }
}
