pub mod manual_override;
